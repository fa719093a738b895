pub mod retry;
pub mod time_utils;

pub use retry::async_retry;
pub use time_utils::{local_date, local_hour, resolve_timezone, Clock, SystemClock, DEFAULT_TZ};
