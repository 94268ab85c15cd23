//! Route table assembly.
//!
//! Two route shapes plus a shared `not found` terminal for everything else,
//! wrapped by the signature filter so rejections never reveal whether a
//! resource exists.

use crate::handlers::{self, not_found};
use crate::security;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/{backend}",
            post(handlers::upload::direct_upload).fallback(not_found),
        )
        .route(
            "/{backend}/{*tail}",
            get(handlers::serve::serve).fallback(not_found),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::verify_signature,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
