use billwise_core::notifications::{ChannelDirectoryTrait, ChannelRef};
use billwise_core::Result;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::upsert::excluded;
use diesel::SqliteConnection;
use std::sync::Arc;

use super::model::{NewUserChannelDB, UserChannelDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::user_channels;
use crate::utils::format_timestamp;

/// Where each user can be reached. One chat id per `(user, channel)`.
pub struct ChannelRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ChannelRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        ChannelRepository { pool, writer }
    }

    /// Links `channel` for the user, replacing the chat id already linked.
    pub async fn upsert_channel(&self, user_id: &str, channel: ChannelRef) -> Result<ChannelRef> {
        let now = format_timestamp(Utc::now());
        let row = NewUserChannelDB {
            user_id: user_id.to_string(),
            channel: channel.channel,
            external_chat_id: channel.chat_id,
            created_at: now.clone(),
            updated_at: now,
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<ChannelRef> {
                let stored = diesel::insert_into(user_channels::table)
                    .values(&row)
                    .on_conflict((user_channels::user_id, user_channels::channel))
                    .do_update()
                    .set((
                        user_channels::external_chat_id
                            .eq(excluded(user_channels::external_chat_id)),
                        user_channels::updated_at.eq(excluded(user_channels::updated_at)),
                    ))
                    .returning(UserChannelDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(ChannelRef::from(stored))
            })
            .await
    }
}

impl ChannelDirectoryTrait for ChannelRepository {
    fn list_channels(&self, user_id: &str) -> Result<Vec<ChannelRef>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = user_channels::table
            .filter(user_channels::user_id.eq(user_id))
            .order(user_channels::id.asc())
            .select(UserChannelDB::as_select())
            .load::<UserChannelDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(ChannelRef::from).collect())
    }
}
