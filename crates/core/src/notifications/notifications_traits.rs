use async_trait::async_trait;

use super::notifications_model::{ChannelRef, ReminderOption};
use crate::errors::Result;

/// Outbound delivery to one chat channel.
#[async_trait]
pub trait NotifierTrait: Send + Sync {
    /// Returns whether the channel accepted the message. Transport errors are
    /// reported as `false`, never raised.
    async fn deliver(&self, channel: &ChannelRef, text: &str, options: &[ReminderOption]) -> bool;
}

/// Lookup of the channels a user can be reached on.
pub trait ChannelDirectoryTrait: Send + Sync {
    fn list_channels(&self, user_id: &str) -> Result<Vec<ChannelRef>>;
}
