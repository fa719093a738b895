//! Ledger collaborator - the transaction store paid bills are recorded into.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bills::BillInstance;
use crate::calendar::RecurrenceKind;
use crate::constants::{DEFAULT_CATEGORY, DEFAULT_CURRENCY, LEDGER_SOURCE_RECURRING};
use crate::errors::Result;
use crate::recurring::RecurringExpense;

/// Expense transaction built from a paid bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSnapshot {
    pub tx_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub merchant: Option<String>,
    pub recurrence: RecurrenceKind,
    pub recurrence_id: String,
    pub source: String,
}

impl TransactionSnapshot {
    /// Builds the ledger entry for `instance`, dated on its due date.
    pub fn for_bill(recurring: &RecurringExpense, instance: &BillInstance) -> Self {
        let currency = if recurring.currency.trim().is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            recurring.currency.clone()
        };
        let category = recurring
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();
        let description = recurring
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| recurring.display_name())
            .to_string();

        Self {
            tx_id: new_tx_id(),
            user_id: recurring.user_id.clone(),
            amount: instance.amount,
            currency,
            category,
            description,
            date: instance.due_date,
            merchant: recurring
                .normalized_merchant
                .clone()
                .or_else(|| Some(recurring.service_name.clone())),
            recurrence: recurring.recurrence,
            recurrence_id: recurring.recurrence_id.clone(),
            source: LEDGER_SOURCE_RECURRING.to_string(),
        }
    }
}

pub fn new_tx_id() -> String {
    format!("TX-{}", Uuid::new_v4().simple())
}

/// Records transactions and returns the stored id.
#[async_trait]
pub trait LedgerTrait: Send + Sync {
    async fn record_transaction(&self, snapshot: TransactionSnapshot) -> Result<String>;
}
