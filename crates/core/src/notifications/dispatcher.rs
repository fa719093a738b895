use log::{debug, warn};
use std::sync::Arc;

use super::notifications_model::ReminderMessage;
use super::notifications_traits::{ChannelDirectoryTrait, NotifierTrait};

/// Fans a message out to every channel a user has configured.
pub struct ReminderDispatcher {
    notifier: Arc<dyn NotifierTrait>,
    channels: Arc<dyn ChannelDirectoryTrait>,
}

impl ReminderDispatcher {
    pub fn new(notifier: Arc<dyn NotifierTrait>, channels: Arc<dyn ChannelDirectoryTrait>) -> Self {
        Self { notifier, channels }
    }

    /// Attempts every channel independently. Returns true when at least one
    /// accepted the message.
    pub async fn dispatch(&self, user_id: &str, message: &ReminderMessage) -> bool {
        let channels = match self.channels.list_channels(user_id) {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Could not load channels for user {}: {}", user_id, e);
                return false;
            }
        };
        if channels.is_empty() {
            debug!("User {} has no delivery channels", user_id);
            return false;
        }

        let mut delivered = false;
        for channel in &channels {
            if self
                .notifier
                .deliver(channel, &message.text, &message.options)
                .await
            {
                delivered = true;
            } else {
                warn!(
                    "Delivery to {} channel failed for user {}",
                    channel.channel, user_id
                );
            }
        }
        delivered
    }
}
