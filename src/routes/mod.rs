//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The HTTP surface exposes the same session the terminal front end drives:
//! snapshot reads, pending-attachment edits, turn submission and the demo
//! timeline. All routes share one `AppState`.

pub mod session;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/session", get(session::get_session))
        .route(
            "/api/attachments",
            post(session::attach_files).delete(session::clear_attachments),
        )
        .route("/api/attachments/{index}", delete(session::remove_attachment))
        .route("/api/turns", post(session::submit_turn))
        .route("/api/demo/script", get(session::demo_script))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
