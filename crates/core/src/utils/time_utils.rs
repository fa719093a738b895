use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::constants::DEFAULT_TIMEZONE;

/// Fallback zone when a stored IANA name cannot be parsed.
pub const DEFAULT_TZ: Tz = chrono_tz::America::Bogota;

/// Source of the current instant.
///
/// Services never call `Utc::now()` directly so ticks and confirmations can be
/// replayed against a fixed instant in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolves an IANA timezone name, falling back to the default zone.
pub fn resolve_timezone(name: &str) -> Tz {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_TZ;
    }
    match trimmed.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(
                "Unknown timezone '{}', falling back to {}",
                trimmed, DEFAULT_TIMEZONE
            );
            DEFAULT_TZ
        }
    }
}

/// Converts a UTC instant to the calendar date observed in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Converts a UTC instant to the wall-clock hour (0-23) observed in `tz`.
pub fn local_hour(instant: DateTime<Utc>, tz: Tz) -> u32 {
    instant.with_timezone(&tz).hour()
}
