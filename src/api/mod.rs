//! HTTP API Module
//!
//! Admin endpoints for the machine catalog.
//!
//! This module contains:
//! - `state`: Shared application state
//! - `guards`: CSRF and authentication collaborators
//! - `form`: Typed parsing of submitted forms
//! - `actions`: The mutating action endpoint
//! - `machines`: List and detail endpoints
//! - `error`: Mapping of core errors onto HTTP responses

pub mod actions;
pub mod error;
pub mod form;
pub mod guards;
pub mod machines;
mod state;

pub use error::ApiError;
pub use guards::{AdminUser, AuthGate, CsrfGuard, StaticCsrfGuard, TokenAuthGate};
pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{any, get},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.upload_dir.clone());
    let upload_prefix = format!("/{}", state.config.upload_url_prefix.trim_matches('/'));
    let body_limit = state.config.max_body_bytes;

    Router::new()
        // Mutations
        .route("/admin/actions/machines", any(actions::handle_action))
        // Reads
        .route("/admin/api/machines", get(machines::list_machines))
        .route("/admin/api/machines/:id", get(machines::get_machine))
        // Ingested images
        .nest_service(&upload_prefix, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
