use std::sync::Arc;

use crate::{api::CallerId, error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use billwise_core::bills::BillInstance;
use billwise_core::calendar::RecurrenceKind;
use billwise_core::recurring::{NewRecurringExpense, RecurringExpense, ScheduleUpdate};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Registration body. The owner comes from the caller, never the payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRecurringBody {
    service_name: String,
    recurrence_id: String,
    normalized_merchant: Option<String>,
    description: Option<String>,
    category: Option<String>,
    amount: Decimal,
    currency: Option<String>,
    #[serde(default)]
    recurrence: RecurrenceKind,
    billing_day: Option<u32>,
    billing_weekday: Option<u32>,
    billing_month: Option<u32>,
    anchor_date: Option<NaiveDate>,
    timezone: Option<String>,
    source_tx_id: Option<String>,
    #[serde(default)]
    auto_add_transaction: bool,
}

impl RegisterRecurringBody {
    fn into_new_expense(self, user_id: String) -> NewRecurringExpense {
        NewRecurringExpense {
            user_id,
            service_name: self.service_name,
            recurrence_id: self.recurrence_id,
            normalized_merchant: self.normalized_merchant,
            description: self.description,
            category: self.category,
            amount: self.amount,
            currency: self.currency,
            recurrence: self.recurrence,
            billing_day: self.billing_day,
            billing_weekday: self.billing_weekday,
            billing_month: self.billing_month,
            anchor_date: self.anchor_date,
            timezone: self.timezone,
            source_tx_id: self.source_tx_id,
            auto_add_transaction: self.auto_add_transaction,
        }
    }
}

#[derive(Deserialize)]
struct AmountBody {
    amount: Decimal,
}

async fn list_recurring(
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<RecurringExpense>>> {
    let expenses = state.recurring_service.list_for_user(&user_id)?;
    Ok(Json(expenses))
}

async fn register_recurring(
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRecurringBody>,
) -> ApiResult<Json<RecurringExpense>> {
    let expense = state
        .recurring_service
        .register_detected(body.into_new_expense(user_id))
        .await?;
    Ok(Json(expense))
}

async fn get_recurring(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RecurringExpense>> {
    let expense = state.recurring_service.get_for_user(&user_id, id)?;
    Ok(Json(expense))
}

async fn configure_schedule(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
    Json(update): Json<ScheduleUpdate>,
) -> ApiResult<Json<RecurringExpense>> {
    let expense = state
        .recurring_service
        .configure_schedule(&user_id, id, update)
        .await?;
    Ok(Json(expense))
}

async fn update_amount(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AmountBody>,
) -> ApiResult<Json<RecurringExpense>> {
    let expense = state
        .recurring_service
        .update_amount(&user_id, id, body.amount)
        .await?;
    Ok(Json(expense))
}

async fn pause_recurring(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RecurringExpense>> {
    Ok(Json(state.recurring_service.pause(&user_id, id).await?))
}

async fn activate_recurring(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RecurringExpense>> {
    Ok(Json(state.recurring_service.activate(&user_id, id).await?))
}

async fn cancel_recurring(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<RecurringExpense>> {
    Ok(Json(state.recurring_service.cancel(&user_id, id).await?))
}

async fn list_bills(
    Path(id): Path<i64>,
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<BillInstance>>> {
    // Ownership check first so foreign ids read as not found.
    let expense = state.recurring_service.get_for_user(&user_id, id)?;
    let bills = state
        .bill_repository
        .list_instances_for_recurring(expense.id)?;
    Ok(Json(bills))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recurring", get(list_recurring).post(register_recurring))
        .route("/recurring/{id}", get(get_recurring))
        .route("/recurring/{id}/schedule", put(configure_schedule))
        .route("/recurring/{id}/amount", put(update_amount))
        .route("/recurring/{id}/pause", post(pause_recurring))
        .route("/recurring/{id}/activate", post(activate_recurring))
        .route("/recurring/{id}/cancel", post(cancel_recurring))
        .route("/recurring/{id}/bills", get(list_bills))
}
