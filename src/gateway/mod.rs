//! SSE relay gateway
//!
//! Serves `GET /stream?prompt=...` by relaying the producer's `POST /chat`
//! response byte for byte.

mod error;
mod handlers;
pub mod relay;
mod router;

pub use relay::{Relay, RelayConfig};
pub use router::create_router;
