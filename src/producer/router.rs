//! Producer route configuration

use std::sync::Arc;

use axum::{Router, routing::post};

use super::handlers::post_chat;
use super::source::TokenSource;

/// Producer shared state
#[derive(Clone)]
pub struct ProducerState {
    pub source: Arc<dyn TokenSource>,
}

/// Create the producer router
///
/// # Endpoints
/// - `POST /chat` - Stream a reply as SSE
pub fn create_router(source: Arc<dyn TokenSource>) -> Router {
    Router::new()
        .route("/chat", post(post_chat))
        .with_state(ProducerState { source })
}
