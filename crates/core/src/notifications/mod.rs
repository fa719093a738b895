//! Notifications - reminder rendering, action tokens, and multi-channel dispatch.

mod action_token;
mod dispatcher;
mod notifications_model;
mod notifications_traits;

pub use action_token::{ActionToken, BillAction};
pub use dispatcher::ReminderDispatcher;
pub use notifications_model::{
    bill_options, format_amount, ChannelRef, ReminderMessage, ReminderOption,
};
pub use notifications_traits::{ChannelDirectoryTrait, NotifierTrait};
