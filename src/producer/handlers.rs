//! Producer handler functions

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use uuid::Uuid;

use super::router::ProducerState;
use super::stream::event_stream;
use crate::common::response::{sse_response, validate_prompt};

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// POST /chat
///
/// Streams the reply to `prompt` as `text/event-stream`
pub async fn post_chat(State(state): State<ProducerState>, Json(payload): Json<ChatRequest>) -> Response {
    if let Err(e) = validate_prompt(&payload.prompt) {
        return e.into_response();
    }

    let stream_id = Uuid::new_v4();
    tracing::info!(
        stream_id = %stream_id,
        source = state.source.name(),
        session_id = payload.session_id.as_deref().unwrap_or("-"),
        prompt_len = payload.prompt.len(),
        "Received POST /chat request"
    );

    let tokens = state.source.tokens(&payload.prompt);
    let frames = event_stream(tokens).map(|event| Ok::<_, Infallible>(event.to_frame()));

    sse_response(frames)
}
