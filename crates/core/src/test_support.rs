//! In-memory repositories and collaborator mocks shared by service tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bills::{
    BillInstance, BillInstanceReminder, BillInstanceUpsert, BillRepositoryTrait, BillStatus,
    DueFollowUp, ReminderStatus,
};
use crate::calendar::RecurrenceKind;
use crate::constants::{DEFAULT_CURRENCY, DEFAULT_REMINDER_HOUR, DEFAULT_TIMEZONE};
use crate::errors::{DatabaseError, Error, Result};
use crate::ledger::{LedgerTrait, TransactionSnapshot};
use crate::notifications::{ChannelDirectoryTrait, ChannelRef, NotifierTrait, ReminderOption};
use crate::recurring::{
    NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate, RecurringRepositoryTrait,
    RecurringStatus, RemindOffsets,
};
use crate::utils::Clock;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Bogota is UTC-5 all year, so local 09:00 is 14:00 UTC.
pub fn bogota_nine_am(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    utc(y, m, d, 14)
}

/// Active monthly expense due on the 5th: 50000 COP, offsets [3, 1, 0], 09:00 Bogota.
pub fn monthly_expense(user_id: &str) -> RecurringExpense {
    let created = utc(2025, 1, 1, 0);
    RecurringExpense {
        id: 0,
        user_id: user_id.to_string(),
        service_name: "Internet".to_string(),
        recurrence_id: format!("{}-internet", user_id),
        normalized_merchant: Some("internet".to_string()),
        description: None,
        category: Some("utilities".to_string()),
        amount: dec!(50000),
        currency: "COP".to_string(),
        recurrence: RecurrenceKind::Monthly,
        billing_day: Some(5),
        billing_weekday: None,
        billing_month: None,
        anchor_date: Some(date(2025, 1, 5)),
        timezone: DEFAULT_TIMEZONE.to_string(),
        reminder_hour: DEFAULT_REMINDER_HOUR,
        remind_offsets: RemindOffsets::default(),
        next_due: None,
        status: RecurringStatus::Active,
        auto_add_transaction: true,
        payment_link: Some("https://pay.example/internet".to_string()),
        payment_reference: Some("REF-1".to_string()),
        source_tx_id: None,
        last_confirmed_at: None,
        canceled_at: None,
        created_at: created,
        updated_at: created,
    }
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    recurring: Vec<RecurringExpense>,
    instances: Vec<BillInstance>,
    reminders: Vec<BillInstanceReminder>,
    poisoned_recurring: HashSet<i64>,
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Obligation store backed by vectors, honoring the same unique keys as SQLite.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_recurring(&self, mut expense: RecurringExpense) -> RecurringExpense {
        let mut state = self.state.lock().unwrap();
        expense.id = state.allocate_id();
        state.recurring.push(expense.clone());
        expense
    }

    pub fn recurring(&self, id: i64) -> RecurringExpense {
        let state = self.state.lock().unwrap();
        state.recurring.iter().find(|r| r.id == id).cloned().unwrap()
    }

    pub fn instances(&self) -> Vec<BillInstance> {
        self.state.lock().unwrap().instances.clone()
    }

    pub fn instance(&self, id: i64) -> BillInstance {
        let state = self.state.lock().unwrap();
        state.instances.iter().find(|i| i.id == id).cloned().unwrap()
    }

    pub fn reminders(&self) -> Vec<BillInstanceReminder> {
        self.state.lock().unwrap().reminders.clone()
    }

    /// Makes instance upserts for `recurring_id` fail.
    pub fn poison_recurring(&self, recurring_id: i64) {
        self.state
            .lock()
            .unwrap()
            .poisoned_recurring
            .insert(recurring_id);
    }

    pub fn set_instance_status(&self, id: i64, status: BillStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(instance) = state.instances.iter_mut().find(|i| i.id == id) {
            instance.status = status;
        }
    }
}

fn not_found(what: &str, id: i64) -> Error {
    Error::Database(DatabaseError::NotFound(format!("{} {}", what, id)))
}

#[async_trait]
impl RecurringRepositoryTrait for InMemoryStore {
    fn find_by_id(&self, id: i64) -> Result<Option<RecurringExpense>> {
        let state = self.state.lock().unwrap();
        Ok(state.recurring.iter().find(|r| r.id == id).cloned())
    }

    fn find_by_recurrence_id(
        &self,
        user_id: &str,
        recurrence_id: &str,
    ) -> Result<Option<RecurringExpense>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .recurring
            .iter()
            .find(|r| r.user_id == user_id && r.recurrence_id == recurrence_id)
            .cloned())
    }

    fn list_active(&self) -> Result<Vec<RecurringExpense>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .recurring
            .iter()
            .filter(|r| r.status == RecurringStatus::Active)
            .cloned()
            .collect())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<RecurringExpense>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .recurring
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_detected(&self, new_expense: NewRecurringExpense) -> Result<RecurringExpense> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state.recurring.iter_mut().find(|r| {
            r.user_id == new_expense.user_id && r.recurrence_id == new_expense.recurrence_id
        }) {
            existing.amount = new_expense.amount;
            existing.service_name = new_expense.service_name;
            if new_expense.description.is_some() {
                existing.description = new_expense.description;
            }
            if new_expense.category.is_some() {
                existing.category = new_expense.category;
            }
            if new_expense.normalized_merchant.is_some() {
                existing.normalized_merchant = new_expense.normalized_merchant;
            }
            if existing.anchor_date.is_none() {
                existing.anchor_date = new_expense.anchor_date;
            }
            if existing.billing_month.is_none() {
                existing.billing_month = new_expense.billing_month;
            }
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = state.allocate_id();
        let expense = RecurringExpense {
            id,
            user_id: new_expense.user_id,
            service_name: new_expense.service_name,
            recurrence_id: new_expense.recurrence_id,
            normalized_merchant: new_expense.normalized_merchant,
            description: new_expense.description,
            category: new_expense.category,
            amount: new_expense.amount,
            currency: new_expense
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            recurrence: new_expense.recurrence,
            billing_day: new_expense.billing_day,
            billing_weekday: new_expense.billing_weekday,
            billing_month: new_expense.billing_month,
            anchor_date: new_expense.anchor_date,
            timezone: new_expense
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            reminder_hour: DEFAULT_REMINDER_HOUR,
            remind_offsets: RemindOffsets::default(),
            next_due: None,
            status: RecurringStatus::Pending,
            auto_add_transaction: new_expense.auto_add_transaction,
            payment_link: None,
            payment_reference: None,
            source_tx_id: new_expense.source_tx_id,
            last_confirmed_at: None,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        };
        state.recurring.push(expense.clone());
        Ok(expense)
    }

    async fn update(&self, update: RecurringExpenseUpdate) -> Result<RecurringExpense> {
        let mut state = self.state.lock().unwrap();
        let expense = state
            .recurring
            .iter_mut()
            .find(|r| r.id == update.id)
            .ok_or_else(|| not_found("recurring expense", update.id))?;
        expense.amount = update.amount;
        expense.billing_day = update.billing_day;
        expense.billing_weekday = update.billing_weekday;
        expense.billing_month = update.billing_month;
        expense.anchor_date = update.anchor_date;
        expense.timezone = update.timezone;
        expense.reminder_hour = update.reminder_hour;
        expense.remind_offsets = update.remind_offsets;
        expense.next_due = update.next_due;
        expense.status = update.status;
        expense.auto_add_transaction = update.auto_add_transaction;
        expense.payment_link = update.payment_link;
        expense.payment_reference = update.payment_reference;
        expense.canceled_at = update.canceled_at;
        expense.updated_at = Utc::now();
        Ok(expense.clone())
    }

    async fn set_next_due(&self, id: i64, next_due: NaiveDate) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let expense = state
            .recurring
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("recurring expense", id))?;
        expense.next_due = Some(next_due);
        Ok(())
    }

    async fn record_confirmation(
        &self,
        id: i64,
        next_due: NaiveDate,
        confirmed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let expense = state
            .recurring
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("recurring expense", id))?;
        expense.next_due = Some(next_due);
        expense.last_confirmed_at = Some(confirmed_at);
        Ok(())
    }
}

#[async_trait]
impl BillRepositoryTrait for InMemoryStore {
    fn get_instance(&self, id: i64) -> Result<Option<BillInstance>> {
        let state = self.state.lock().unwrap();
        Ok(state.instances.iter().find(|i| i.id == id).cloned())
    }

    fn list_instances_for_recurring(&self, recurring_id: i64) -> Result<Vec<BillInstance>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .instances
            .iter()
            .filter(|i| i.recurring_id == recurring_id)
            .cloned()
            .collect())
    }

    fn list_reminders(&self, bill_instance_id: i64) -> Result<Vec<BillInstanceReminder>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .reminders
            .iter()
            .filter(|r| r.bill_instance_id == bill_instance_id)
            .cloned()
            .collect())
    }

    fn list_open_follow_ups(&self, around: NaiveDate) -> Result<Vec<DueFollowUp>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .instances
            .iter()
            .filter(|i| {
                matches!(i.status, BillStatus::Pending | BillStatus::Overdue)
                    && i.follow_up_on
                        .is_some_and(|day| (day - around).num_days().abs() <= 1)
            })
            .filter_map(|i| {
                state
                    .recurring
                    .iter()
                    .find(|r| r.id == i.recurring_id && r.status == RecurringStatus::Active)
                    .map(|r| DueFollowUp {
                        instance: i.clone(),
                        recurring: r.clone(),
                    })
            })
            .collect())
    }

    async fn upsert_instance(&self, upsert: BillInstanceUpsert) -> Result<BillInstance> {
        let mut state = self.state.lock().unwrap();
        if state.poisoned_recurring.contains(&upsert.recurring_id) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "disk I/O error".to_string(),
            )));
        }
        let now = Utc::now();
        if let Some(existing) = state.instances.iter_mut().find(|i| {
            i.recurring_id == upsert.recurring_id
                && i.period_year == upsert.period_year
                && i.period_month == upsert.period_month
        }) {
            existing.due_date = upsert.due_date;
            existing.amount = upsert.amount;
            existing.payment_link = upsert.payment_link;
            existing.reference_number = upsert.reference_number;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let id = state.allocate_id();
        let instance = BillInstance {
            id,
            recurring_id: upsert.recurring_id,
            period_year: upsert.period_year,
            period_month: upsert.period_month,
            due_date: upsert.due_date,
            status: BillStatus::Pending,
            amount: upsert.amount,
            payment_link: upsert.payment_link,
            reference_number: upsert.reference_number,
            paid_at: None,
            tx_id: None,
            follow_up_on: None,
            created_at: now,
            updated_at: now,
        };
        state.instances.push(instance.clone());
        Ok(instance)
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut marked = 0;
        for instance in state
            .instances
            .iter_mut()
            .filter(|i| i.status == BillStatus::Pending && i.due_date < today)
        {
            instance.status = BillStatus::Overdue;
            marked += 1;
        }
        Ok(marked)
    }

    async fn create_reminder_if_missing(
        &self,
        bill_instance_id: i64,
        reminder_offset: i32,
        scheduled_for: NaiveDate,
    ) -> Result<Option<BillInstanceReminder>> {
        let mut state = self.state.lock().unwrap();
        if state.reminders.iter().any(|r| {
            r.bill_instance_id == bill_instance_id
                && r.reminder_offset == reminder_offset
                && r.scheduled_for == scheduled_for
        }) {
            return Ok(None);
        }
        let now = Utc::now();
        let reminder = BillInstanceReminder {
            id: state.allocate_id(),
            bill_instance_id,
            reminder_offset,
            scheduled_for,
            status: ReminderStatus::Pending,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        state.reminders.push(reminder.clone());
        Ok(Some(reminder))
    }

    async fn mark_reminder_sent(&self, reminder_id: i64, sent_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let reminder = state
            .reminders
            .iter_mut()
            .find(|r| r.id == reminder_id)
            .ok_or_else(|| not_found("reminder", reminder_id))?;
        reminder.status = ReminderStatus::Sent;
        reminder.sent_at = Some(sent_at);
        Ok(())
    }

    async fn mark_paid(&self, id: i64, paid_at: DateTime<Utc>, tx_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("bill instance", id))?;
        if instance.status == BillStatus::Paid {
            return Ok(false);
        }
        instance.status = BillStatus::Paid;
        instance.paid_at = Some(paid_at);
        instance.tx_id = Some(tx_id.to_string());
        instance.follow_up_on = None;
        Ok(true)
    }

    async fn reopen_instance(
        &self,
        id: i64,
        status: BillStatus,
        follow_up_on: Option<NaiveDate>,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("bill instance", id))?;
        instance.status = status;
        instance.paid_at = None;
        instance.tx_id = None;
        instance.follow_up_on = follow_up_on;
        Ok(())
    }

    async fn schedule_follow_up(&self, id: i64, follow_up_on: NaiveDate) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("bill instance", id))?;
        if instance.status == BillStatus::Paid {
            return Ok(false);
        }
        instance.status = BillStatus::Pending;
        instance.follow_up_on = Some(follow_up_on);
        Ok(true)
    }

    async fn clear_follow_up(&self, id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| not_found("bill instance", id))?;
        instance.follow_up_on = None;
        Ok(())
    }
}

/// Records every delivery attempt; channels listed in `failing` reject.
#[derive(Default)]
pub struct MockNotifier {
    pub attempts: Mutex<Vec<(ChannelRef, String, Vec<ReminderOption>)>>,
    failing: Mutex<HashSet<String>>,
}

impl MockNotifier {
    pub fn fail_channel(&self, channel: &str) {
        self.failing.lock().unwrap().insert(channel.to_string());
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn delivered_texts(&self) -> Vec<String> {
        let failing = self.failing.lock().unwrap();
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(channel, _, _)| !failing.contains(&channel.channel))
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl NotifierTrait for MockNotifier {
    async fn deliver(&self, channel: &ChannelRef, text: &str, options: &[ReminderOption]) -> bool {
        self.attempts
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string(), options.to_vec()));
        !self.failing.lock().unwrap().contains(&channel.channel)
    }
}

#[derive(Default)]
pub struct StaticChannels {
    channels: Mutex<HashMap<String, Vec<ChannelRef>>>,
}

impl StaticChannels {
    pub fn with(self, user_id: &str, channels: Vec<ChannelRef>) -> Self {
        self.channels
            .lock()
            .unwrap()
            .insert(user_id.to_string(), channels);
        self
    }
}

impl ChannelDirectoryTrait for StaticChannels {
    fn list_channels(&self, user_id: &str) -> Result<Vec<ChannelRef>> {
        Ok(self
            .channels
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockLedger {
    pub recorded: Mutex<Vec<TransactionSnapshot>>,
    failing: AtomicBool,
}

impl MockLedger {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn recorded(&self) -> Vec<TransactionSnapshot> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerTrait for MockLedger {
    async fn record_transaction(&self, snapshot: TransactionSnapshot) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Ledger("ledger unavailable".to_string()));
        }
        let tx_id = snapshot.tx_id.clone();
        self.recorded.lock().unwrap().push(snapshot);
        Ok(tx_id)
    }
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
