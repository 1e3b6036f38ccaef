//! Token-producing service
//!
//! Serves `POST /chat`, encoding each token of a [`TokenSource`] as one SSE
//! `token` event between `started` and `done` status markers.

mod handlers;
mod router;
pub mod source;
pub mod stream;

pub use router::create_router;
pub use source::TokenSource;
