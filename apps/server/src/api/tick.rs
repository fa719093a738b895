use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

/// Runs one billing tick now, outside the background schedule.
async fn run_tick(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    match state.billing_tick.run().await {
        Some(report) => Ok(Json(json!(report))),
        None => Ok(Json(json!({ "skipped": true }))),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tick", post(run_tick))
}
