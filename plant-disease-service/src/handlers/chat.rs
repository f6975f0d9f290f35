use crate::dtos::{ChatRequest, ChatResponse};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use service_core::error::AppError;
use service_core::middleware::RequestId;
use validator::Validate;

pub async fn chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    tracing::info!(
        request_id = %request_id.0,
        message_len = request.message.len(),
        "Chat request received"
    );

    let reply = state.assistant.reply(&request.message).await?;

    Ok(Json(ChatResponse { reply }))
}
