//! Due-date arithmetic for the five recurrence kinds.
//!
//! `next_due` is pure and total: it never fails and returns the same date for
//! the same inputs. Missing calendar fields fall back to the anchor date and
//! then to `today`; day-of-month values are clamped to the real length of the
//! month they land in.

use chrono::{Datelike, Duration, NaiveDate};

use super::calendar_model::{RecurrenceKind, RecurrencePolicy};

const BIWEEKLY_PERIOD_DAYS: i64 = 14;

/// Computes the first due date on or after `today` for `policy`.
pub fn next_due(policy: &RecurrencePolicy, today: NaiveDate) -> NaiveDate {
    match policy.kind {
        RecurrenceKind::Weekly | RecurrenceKind::Biweekly => next_weekday_due(policy, today),
        RecurrenceKind::Monthly => next_monthly_due(policy, today),
        RecurrenceKind::Quarterly => next_quarterly_due(policy, today),
        RecurrenceKind::Yearly => next_yearly_due(policy, today),
    }
}

/// Number of days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Builds `year-month-day`, clamping `day` to the month's last day.
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

fn resolve_day(policy: &RecurrencePolicy, today: NaiveDate) -> u32 {
    policy
        .billing_day
        .filter(|d| (1..=31).contains(d))
        .or_else(|| policy.anchor_date.map(|a| a.day()))
        .unwrap_or_else(|| today.day())
}

fn resolve_month(policy: &RecurrencePolicy, today: NaiveDate) -> u32 {
    policy
        .billing_month
        .filter(|m| (1..=12).contains(m))
        .or_else(|| policy.anchor_date.map(|a| a.month()))
        .unwrap_or_else(|| today.month())
}

fn resolve_weekday(policy: &RecurrencePolicy, today: NaiveDate) -> u32 {
    policy
        .billing_weekday
        .filter(|w| *w <= 6)
        .or_else(|| {
            policy
                .anchor_date
                .map(|a| a.weekday().num_days_from_monday())
        })
        .unwrap_or_else(|| today.weekday().num_days_from_monday())
}

fn next_weekday_due(policy: &RecurrencePolicy, today: NaiveDate) -> NaiveDate {
    let target = resolve_weekday(policy, today);
    let current = today.weekday().num_days_from_monday();
    let days_ahead = (target + 7 - current) % 7;
    let mut candidate = today + Duration::days(i64::from(days_ahead));

    if policy.kind == RecurrenceKind::Biweekly {
        let anchor = policy.anchor_date.unwrap_or(today);
        let misalignment = (candidate - anchor).num_days().rem_euclid(BIWEEKLY_PERIOD_DAYS);
        if misalignment != 0 {
            candidate += Duration::days(BIWEEKLY_PERIOD_DAYS - misalignment);
        }
    }
    candidate
}

fn next_monthly_due(policy: &RecurrencePolicy, today: NaiveDate) -> NaiveDate {
    let day = resolve_day(policy, today);
    let this_month = clamped_date(today.year(), today.month(), day).unwrap_or(today);
    if this_month >= today {
        return this_month;
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    clamped_date(year, month, day).unwrap_or(today)
}

fn next_quarterly_due(policy: &RecurrencePolicy, today: NaiveDate) -> NaiveDate {
    let day = resolve_day(policy, today);
    let base_month = resolve_month(policy, today);

    // Quarter months over this year and next; the earliest one on or after
    // today is always within the window.
    (0..=1)
        .flat_map(|year_offset| {
            let year = today.year() + year_offset;
            quarter_months(base_month)
                .into_iter()
                .filter_map(move |month| clamped_date(year, month, day))
        })
        .filter(|candidate| *candidate >= today)
        .min()
        .unwrap_or(today)
}

/// The four months of the quarterly cycle anchored at `base_month`.
pub fn quarter_months(base_month: u32) -> [u32; 4] {
    let base = base_month.clamp(1, 12) - 1;
    [0, 3, 6, 9].map(|step| (base + step) % 12 + 1)
}

fn next_yearly_due(policy: &RecurrencePolicy, today: NaiveDate) -> NaiveDate {
    let day = resolve_day(policy, today);
    let month = resolve_month(policy, today);
    let this_year = clamped_date(today.year(), month, day).unwrap_or(today);
    if this_year >= today {
        return this_year;
    }
    clamped_date(today.year() + 1, month, day).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
    }

    #[test]
    fn test_monthly_clamps_to_february_length() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Monthly).with_billing_day(31);
        assert_eq!(next_due(&policy, date(2024, 2, 15)), date(2024, 2, 29));
        assert_eq!(next_due(&policy, date(2023, 2, 15)), date(2023, 2, 28));
    }

    #[test]
    fn test_monthly_rolls_into_next_month_and_year() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Monthly).with_billing_day(5);
        assert_eq!(next_due(&policy, date(2025, 6, 5)), date(2025, 6, 5));
        assert_eq!(next_due(&policy, date(2025, 6, 6)), date(2025, 7, 5));
        assert_eq!(next_due(&policy, date(2025, 12, 20)), date(2026, 1, 5));
    }

    #[test]
    fn test_monthly_clamps_target_month_after_rollover() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Monthly).with_billing_day(31);
        // Past Jan 31 only once Feb starts; Feb has 28 days in 2025.
        assert_eq!(next_due(&policy, date(2025, 1, 31)), date(2025, 1, 31));
        assert_eq!(next_due(&policy, date(2025, 2, 1)), date(2025, 2, 28));
        assert_eq!(next_due(&policy, date(2025, 4, 30)), date(2025, 4, 30));
    }

    #[test]
    fn test_monthly_falls_back_to_anchor_then_today() {
        let anchored =
            RecurrencePolicy::new(RecurrenceKind::Monthly).with_anchor_date(date(2025, 1, 20));
        assert_eq!(next_due(&anchored, date(2025, 3, 10)), date(2025, 3, 20));

        let bare = RecurrencePolicy::new(RecurrenceKind::Monthly);
        assert_eq!(next_due(&bare, date(2025, 3, 10)), date(2025, 3, 10));
    }

    #[test]
    fn test_out_of_range_billing_day_is_ignored() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Monthly)
            .with_billing_day(45)
            .with_anchor_date(date(2025, 1, 7));
        assert_eq!(next_due(&policy, date(2025, 3, 1)), date(2025, 3, 7));
    }

    #[test]
    fn test_weekly_same_day_returns_today() {
        // 2025-06-04 is a Wednesday.
        let policy = RecurrencePolicy::new(RecurrenceKind::Weekly).with_billing_weekday(2);
        assert_eq!(next_due(&policy, date(2025, 6, 4)), date(2025, 6, 4));
        assert_eq!(next_due(&policy, date(2025, 6, 5)), date(2025, 6, 11));
    }

    #[test]
    fn test_weekly_uses_anchor_weekday() {
        // Anchor is a Friday.
        let policy =
            RecurrencePolicy::new(RecurrenceKind::Weekly).with_anchor_date(date(2025, 5, 30));
        assert_eq!(next_due(&policy, date(2025, 6, 2)), date(2025, 6, 6));
    }

    #[test]
    fn test_biweekly_aligns_with_anchor() {
        // Anchor Monday 2025-06-02; today Monday 2025-06-09 is an off week.
        let policy = RecurrencePolicy::new(RecurrenceKind::Biweekly)
            .with_billing_weekday(0)
            .with_anchor_date(date(2025, 6, 2));
        assert_eq!(next_due(&policy, date(2025, 6, 9)), date(2025, 6, 16));
        assert_eq!(next_due(&policy, date(2025, 6, 16)), date(2025, 6, 16));
        assert_eq!(next_due(&policy, date(2025, 6, 17)), date(2025, 6, 30));
    }

    #[test]
    fn test_biweekly_with_future_anchor() {
        let anchor = date(2025, 7, 14);
        let policy = RecurrencePolicy::new(RecurrenceKind::Biweekly).with_anchor_date(anchor);
        let due = next_due(&policy, date(2025, 6, 20));
        assert_eq!((due - anchor).num_days().rem_euclid(14), 0);
        assert_eq!(due, date(2025, 6, 30));
    }

    #[test]
    fn test_quarterly_picks_next_quarter_month() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Quarterly)
            .with_billing_day(15)
            .with_billing_month(11);
        // Quarter months: Nov, Feb, May, Aug.
        assert_eq!(next_due(&policy, date(2024, 3, 1)), date(2024, 5, 15));
        assert_eq!(next_due(&policy, date(2024, 12, 20)), date(2025, 2, 15));
        assert_eq!(next_due(&policy, date(2024, 11, 15)), date(2024, 11, 15));
    }

    #[test]
    fn test_quarterly_wraps_into_next_year() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Quarterly)
            .with_billing_day(10)
            .with_billing_month(2);
        // Feb, May, Aug, Nov: nothing left in 2024 after Nov 10.
        assert_eq!(next_due(&policy, date(2024, 12, 20)), date(2025, 2, 10));
    }

    #[test]
    fn test_quarterly_clamps_each_candidate() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Quarterly)
            .with_billing_day(31)
            .with_billing_month(1);
        // Jan, Apr, Jul, Oct: April has 30 days.
        assert_eq!(next_due(&policy, date(2025, 2, 1)), date(2025, 4, 30));
    }

    #[test]
    fn test_quarter_months() {
        assert_eq!(quarter_months(1), [1, 4, 7, 10]);
        assert_eq!(quarter_months(11), [11, 2, 5, 8]);
        assert_eq!(quarter_months(12), [12, 3, 6, 9]);
    }

    #[test]
    fn test_yearly_moves_to_next_year() {
        let policy = RecurrencePolicy::new(RecurrenceKind::Yearly)
            .with_billing_day(29)
            .with_billing_month(2);
        assert_eq!(next_due(&policy, date(2024, 1, 10)), date(2024, 2, 29));
        assert_eq!(next_due(&policy, date(2024, 3, 1)), date(2025, 2, 28));
    }

    #[test]
    fn test_next_due_is_deterministic() {
        let today = date(2025, 6, 2);
        for kind in [
            RecurrenceKind::Weekly,
            RecurrenceKind::Biweekly,
            RecurrenceKind::Monthly,
            RecurrenceKind::Quarterly,
            RecurrenceKind::Yearly,
        ] {
            let policy = RecurrencePolicy::new(kind)
                .with_billing_day(5)
                .with_billing_weekday(3)
                .with_anchor_date(date(2025, 1, 5));
            assert_eq!(next_due(&policy, today), next_due(&policy, today));
            assert!(next_due(&policy, today) >= today);
        }
    }
}
