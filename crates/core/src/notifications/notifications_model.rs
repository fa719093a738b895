//! Delivery-facing models: where a message goes and what it says.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::action_token::{ActionToken, BillAction};
use crate::bills::BillInstance;
use crate::recurring::RecurringExpense;

/// A user's address on one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub channel: String,
    pub chat_id: String,
}

impl ChannelRef {
    pub fn new(channel: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            chat_id: chat_id.into(),
        }
    }
}

/// One answer button offered with a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOption {
    pub action_id: String,
    pub label: String,
}

/// Rendered reminder: body text plus the paid/later/no options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub text: String,
    pub options: Vec<ReminderOption>,
}

const PLACEHOLDER: &str = "—";

impl ReminderMessage {
    /// Reminder sent `offset` days before the instance is due.
    pub fn reminder(recurring: &RecurringExpense, instance: &BillInstance, offset: u32) -> Self {
        let when = if offset == 0 {
            "today".to_string()
        } else {
            format!("in {} day(s)", offset)
        };
        Self::render("⏰ Payment reminder", &when, recurring, instance)
    }

    /// Re-prompt for a bill the user asked to be reminded about later.
    pub fn follow_up(recurring: &RecurringExpense, instance: &BillInstance) -> Self {
        Self::render("🔁 Payment follow-up", "pending", recurring, instance)
    }

    fn render(
        heading: &str,
        when: &str,
        recurring: &RecurringExpense,
        instance: &BillInstance,
    ) -> Self {
        let text = format!(
            "{heading}\n\
             Due: {due} ({when})\n\
             Amount: {amount}\n\
             Service: {service}\n\
             Link: {link}\n\
             Reference: {reference}\n\n\
             Have you paid?",
            heading = heading,
            due = format_date(instance.due_date),
            when = when,
            amount = format_amount(instance.amount, &recurring.currency),
            service = recurring.display_name(),
            link = or_placeholder(instance.payment_link.as_deref()),
            reference = or_placeholder(instance.reference_number.as_deref()),
        );
        Self {
            text,
            options: bill_options(instance.id),
        }
    }
}

/// The three answer options for a bill, each carrying an encoded action.
pub fn bill_options(bill_instance_id: i64) -> Vec<ReminderOption> {
    [
        (BillAction::Paid, "✅ Paid"),
        (BillAction::Later, "⏳ Later"),
        (BillAction::No, "❌ Not paid"),
    ]
    .into_iter()
    .map(|(action, label)| ReminderOption {
        action_id: ActionToken::new(action, bill_instance_id).to_string(),
        label: label.to_string(),
    })
    .collect()
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(PLACEHOLDER)
}

/// Whole-unit amount with `.` thousands separators; pesos print as `$`.
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_u128().unwrap_or(0).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let currency = currency.trim().to_uppercase();
    if currency == "COP" || currency.is_empty() {
        format!("{}${}", sign, grouped)
    } else {
        format!("{}{} {}", sign, currency, grouped)
    }
}
