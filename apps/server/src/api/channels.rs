use std::sync::Arc;

use crate::{
    api::CallerId,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{extract::State, routing::put, Json, Router};
use billwise_core::notifications::{ChannelDirectoryTrait, ChannelRef};

async fn list_channels(
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ChannelRef>>> {
    let channels = state.channel_repository.list_channels(&user_id)?;
    Ok(Json(channels))
}

/// Registers or re-points the caller's chat on one channel.
async fn upsert_channel(
    CallerId(user_id): CallerId,
    State(state): State<Arc<AppState>>,
    Json(channel): Json<ChannelRef>,
) -> ApiResult<Json<ChannelRef>> {
    if channel.channel.trim().is_empty() || channel.chat_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "channel and chatId are required".to_string(),
        ));
    }
    let saved = state
        .channel_repository
        .upsert_channel(&user_id, channel)
        .await?;
    Ok(Json(saved))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/channels", put(upsert_channel).get(list_channels))
}
