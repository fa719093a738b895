//! Database models for user delivery channels.

use billwise_core::notifications::ChannelRef;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::user_channels)]
#[serde(rename_all = "camelCase")]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserChannelDB {
    pub id: i64,
    pub user_id: String,
    pub channel: String,
    pub external_chat_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::user_channels)]
pub struct NewUserChannelDB {
    pub user_id: String,
    pub channel: String,
    pub external_chat_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserChannelDB> for ChannelRef {
    fn from(db: UserChannelDB) -> Self {
        ChannelRef::new(db.channel, db.external_chat_id)
    }
}
