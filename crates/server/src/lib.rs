//! Totem voice backend server
//!
//! Axum HTTP + WebSocket front for the kiosk: the WebSocket path carries
//! continuous calls (one orchestrator per connection), the HTTP path
//! serves one-shot questions, the catalog, and health.

pub mod http;
pub mod metrics;
pub mod state;
pub mod ws;

pub use http::create_router;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Startup error: {0}")]
    Startup(String),
}
