//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the one quotation session served by this process; the session
//! handle owns its own locking, so the state is cheap to clone.

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::services::session::SessionHandle;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { session: SessionHandle::new(llm) }
    }
}
