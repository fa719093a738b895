use std::sync::Arc;

use crate::{
    api::CallerId,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{extract::State, routing::post, Json, Router};
use billwise_core::confirmations::ConfirmationOutcome;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionBody {
    action_id: String,
}

/// Handles a tapped reminder option (`recurring:<action>:<bill id>`).
async fn handle_action(
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
    Json(body): Json<ActionBody>,
) -> ApiResult<Json<ConfirmationOutcome>> {
    let action_id = body.action_id.trim();
    if action_id.is_empty() {
        return Err(ApiError::BadRequest("actionId is required".to_string()));
    }
    let outcome = state
        .confirmation_service
        .handle_action(&user_id, action_id)
        .await?;
    tracing::info!(user_id = %user_id, action_id, ?outcome, "Handled bill action");
    Ok(Json(outcome))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/actions", post(handle_action))
}
