//! Gateway route configuration

use std::sync::Arc;

use axum::{Router, routing::get};

use super::handlers::get_stream;
use super::relay::Relay;

/// Gateway shared state
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Arc<Relay>,
}

/// Create the gateway router
///
/// # Endpoints
/// - `GET /stream?prompt=...` - Relay the producer's SSE stream
pub fn create_router(relay: Relay) -> Router {
    Router::new()
        .route("/stream", get(get_stream))
        .layer(cors_layer())
        .with_state(GatewayState {
            relay: Arc::new(relay),
        })
}

/// CORS middleware layer
///
/// Allows any origin so browser `EventSource` clients can connect directly.
pub fn cors_layer() -> tower_http::cors::CorsLayer {
    use tower_http::cors::{Any, CorsLayer};

    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
