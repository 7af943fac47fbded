//! The canned-response assistant endpoint.

use crate::error::ApiError;
use axum::routing::post;
use axum::Json;
use serde::Deserialize;
use sightline_core::assistant::{self, AssistantReply};

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub message: String,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new().route("/chat", post(post_chat))
}

/// POST /api/v1/chat — keyword-matched reply with sample SQL and chart data.
#[tracing::instrument(level = "debug", skip_all)]
async fn post_chat(Json(body): Json<ChatMessage>) -> Result<Json<AssistantReply>, ApiError> {
    Ok(Json(assistant::reply(&body.message)))
}
