//! Gateway handler functions

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::router::GatewayState;
use crate::common::response::{sse_response, validate_prompt};

/// Query parameters of `GET /stream`
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub prompt: String,
}

/// GET /stream
///
/// Relays the producer's SSE reply for `prompt`
pub async fn get_stream(State(state): State<GatewayState>, Query(query): Query<StreamQuery>) -> Response {
    if let Err(e) = validate_prompt(&query.prompt) {
        return e.into_response();
    }

    tracing::info!(
        upstream = %state.relay.chat_url(),
        prompt_len = query.prompt.len(),
        "Received GET /stream request"
    );

    sse_response(state.relay.relay(&query.prompt))
}
