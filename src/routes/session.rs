//! Session routes.
//!
//! Handlers only translate JSON to session calls. An ignored turn is a
//! normal outcome and is returned with 200.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;

use crate::attachment::{FileDescriptor, RawFile};
use crate::sequencer::script::{DEMO_SCRIPT, Stage};
use crate::services::session::{SessionSnapshot, TurnOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TurnBody {
    #[serde(default)]
    pub prompt: String,
}

/// `GET /api/session`: transcript, busy flag and pending attachments.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// `POST /api/attachments`: add files to the pending list.
pub async fn attach_files(
    State(state): State<AppState>,
    Json(files): Json<Vec<RawFile>>,
) -> Json<Vec<FileDescriptor>> {
    Json(state.session.attach(&files).await)
}

/// `DELETE /api/attachments/:index`: remove one pending file.
pub async fn remove_attachment(State(state): State<AppState>, Path(index): Path<usize>) -> Json<Vec<FileDescriptor>> {
    Json(state.session.remove_attachment(index).await)
}

/// `DELETE /api/attachments`: empty the pending list.
pub async fn clear_attachments(State(state): State<AppState>) -> Json<Vec<FileDescriptor>> {
    Json(state.session.clear_attachments().await)
}

/// `POST /api/turns`: run one turn and return its outcome.
pub async fn submit_turn(State(state): State<AppState>, Json(body): Json<TurnBody>) -> Json<TurnOutcome> {
    Json(state.session.send(&body.prompt).await)
}

/// `GET /api/demo/script`: the scripted demo timeline.
pub async fn demo_script() -> Json<&'static [Stage]> {
    Json(DEMO_SCRIPT)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
