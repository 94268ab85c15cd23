//! Depot serving application
//!
//! HTTP entry point for stored content: plain and processed retrieval,
//! anonymous direct upload for flagged backends, and request-signature
//! verification wrapping the whole route table.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod security;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
