/// Timezone used when a recurring expense carries no (or an unknown) IANA name.
pub const DEFAULT_TIMEZONE: &str = "America/Bogota";

/// Local hour at which reminders fire when none was configured.
pub const DEFAULT_REMINDER_HOUR: u32 = 9;

/// Days-before-due offsets used for new or misconfigured recurring expenses.
pub const DEFAULT_REMIND_OFFSETS: [u32; 3] = [3, 1, 0];

/// Reminder offset reserved for "later" follow-up prompts.
/// Lives outside the days-before-due namespace, which is always >= 0.
pub const FOLLOW_UP_OFFSET: i32 = -1;

/// Domain tag carried by every bill action token (`recurring:paid:42`).
pub const ACTION_DOMAIN: &str = "recurring";

/// Currency assumed when a detected recurring payment carries none.
pub const DEFAULT_CURRENCY: &str = "COP";

/// Category assumed when a detected recurring payment carries none.
pub const DEFAULT_CATEGORY: &str = "misc";

/// Ledger `source` recorded for transactions created from bill confirmations.
pub const LEDGER_SOURCE_RECURRING: &str = "recurring";
