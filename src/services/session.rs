//! Session service: turn orchestration over the transcript.
//!
//! DESIGN
//! ======
//! `Session` is plain state: the transcript, the pending attachments and the
//! turn phase. Every transition is a synchronous method, so the state machine
//! is testable without a runtime.
//!
//! `SessionHandle` shares one session between tasks. A turn holds the lock
//! only around `begin_turn` and `complete_turn`; the analysis call runs
//! unlocked, and the `Awaiting` phase rejects any second turn meanwhile.
//! Once accepted, a turn is resolved on its own spawned task, so a caller
//! that stops waiting (a dropped HTTP request, a timeout) cannot leave the
//! session stuck in `Awaiting`.
//! After every mutation a fresh `SessionSnapshot` is published on a watch
//! channel for renderers.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{error, info};

use crate::attachment::{AttachmentCollector, FileDescriptor, RawFile};
use crate::llm::LlmChat;
use crate::services::analysis::{self, AnalysisSource, fallback_result};
use crate::transcript::{AnalysisResult, Message, Transcript};

// =============================================================================
// TYPES
// =============================================================================

/// Per-turn phase. `Sending` is only observable inside `begin_turn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    Sending,
    Awaiting,
}

/// Why a submission did not start a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// A turn is already awaiting its analysis.
    Busy,
    /// Blank prompt and no pending attachments.
    EmptyInput,
}

/// A turn that has been accepted and is waiting for its analysis.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub user: Message,
    pub prompt: String,
    pub attachments: Vec<FileDescriptor>,
}

/// Result of one submission.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    Ignored { reason: IgnoreReason },
    Answered { user: Message, assistant: Message, source: AnalysisSource },
}

/// Read-only view handed to renderers and the HTTP surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub busy: bool,
    pub pending: Vec<FileDescriptor>,
}

// =============================================================================
// SESSION STATE
// =============================================================================

#[derive(Debug)]
pub struct Session {
    transcript: Transcript,
    attachments: AttachmentCollector,
    phase: TurnPhase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self { transcript: Transcript::new(), attachments: AttachmentCollector::new(), phase: TurnPhase::Idle }
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn pending(&self) -> &[FileDescriptor] {
        self.attachments.pending()
    }

    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    pub fn attach(&mut self, raw_files: &[RawFile]) {
        self.attachments.attach(raw_files);
    }

    pub fn remove_attachment(&mut self, index: usize) {
        self.attachments.remove(index);
    }

    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }

    /// Start a turn: append the user message with the drained attachments
    /// and move to `Awaiting`.
    ///
    /// # Errors
    ///
    /// Returns the reason when the submission is a no-op. The session is
    /// left untouched in that case.
    pub fn begin_turn(&mut self, prompt: &str) -> Result<PendingTurn, IgnoreReason> {
        if self.phase != TurnPhase::Idle {
            return Err(IgnoreReason::Busy);
        }
        let prompt = prompt.trim();
        if prompt.is_empty() && self.attachments.is_empty() {
            return Err(IgnoreReason::EmptyInput);
        }

        self.phase = TurnPhase::Sending;
        let attachments = self.attachments.drain();
        let user = self.transcript.push_user(prompt, attachments.clone());
        self.phase = TurnPhase::Awaiting;

        Ok(PendingTurn { user, prompt: prompt.to_owned(), attachments })
    }

    /// Resolve the awaiting turn with its analysis and return to `Idle`.
    pub fn complete_turn(&mut self, result: AnalysisResult) -> Message {
        let assistant = self.transcript.push_assistant(result);
        self.phase = TurnPhase::Idle;
        assistant
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.transcript.messages().to_vec(),
            busy: self.is_busy(),
            pending: self.attachments.pending().to_vec(),
        }
    }
}

// =============================================================================
// SHARED HANDLE
// =============================================================================

/// Cloneable handle to one shared session.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<Session>>,
    llm: Option<Arc<dyn LlmChat>>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionHandle {
    /// Create an empty session. Without a client every turn resolves to the
    /// fallback report.
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { session: Arc::new(Mutex::new(Session::new())), llm, snapshots: Arc::new(tx) }
    }

    /// Subscribe to snapshots published after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Add files to the pending list and return it.
    pub async fn attach(&self, raw_files: &[RawFile]) -> Vec<FileDescriptor> {
        self.mutate(|s| s.attach(raw_files)).await
    }

    /// Remove one pending file; out of range is a no-op.
    pub async fn remove_attachment(&self, index: usize) -> Vec<FileDescriptor> {
        self.mutate(|s| s.remove_attachment(index)).await
    }

    pub async fn clear_attachments(&self) -> Vec<FileDescriptor> {
        self.mutate(Session::clear_attachments).await
    }

    async fn mutate(&self, f: impl FnOnce(&mut Session)) -> Vec<FileDescriptor> {
        let mut session = self.session.lock().await;
        f(&mut *session);
        self.publish(&session);
        session.pending().to_vec()
    }

    /// Run one turn to completion.
    ///
    /// Returns `Ignored` immediately for a blank submission or while another
    /// turn is awaiting. Otherwise the user message is visible to subscribers
    /// before the analysis starts, and the assistant message after it ends.
    /// Dropping the returned future does not cancel an accepted turn.
    pub async fn send(&self, prompt: &str) -> TurnOutcome {
        let turn = {
            let mut session = self.session.lock().await;
            match session.begin_turn(prompt) {
                Ok(turn) => {
                    self.publish(&session);
                    turn
                }
                Err(reason) => {
                    info!(?reason, "session: turn ignored");
                    return TurnOutcome::Ignored { reason };
                }
            }
        };
        info!(message_id = %turn.user.id, attachments = turn.attachments.len(), "session: turn started");

        let user = turn.user.clone();
        let task = tokio::spawn({
            let handle = self.clone();
            async move { handle.resolve_turn(turn).await }
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(message_id = %user.id, error = %e, "session: turn task failed, using fallback report");
                let assistant = self.abandon_turn().await;
                TurnOutcome::Answered { user, assistant, source: AnalysisSource::Fallback { code: "E_TURN_ABORTED" } }
            }
        }
    }

    async fn resolve_turn(&self, turn: PendingTurn) -> TurnOutcome {
        let analysis = analysis::analyze_with_source(self.llm.as_deref(), &turn.prompt, &turn.attachments).await;

        let mut session = self.session.lock().await;
        let assistant = session.complete_turn(analysis.result);
        self.publish(&session);
        info!(
            message_id = %assistant.id,
            fallback = analysis.source.is_fallback(),
            "session: turn completed"
        );

        TurnOutcome::Answered { user: turn.user, assistant, source: analysis.source }
    }

    /// Close a turn whose task died before resolving it. A turn that did
    /// resolve is left alone and its assistant message returned.
    async fn abandon_turn(&self) -> Message {
        let mut session = self.session.lock().await;
        let resolved = session.transcript().messages().last().filter(|_| !session.is_busy()).cloned();
        if let Some(last) = resolved {
            return last;
        }
        let assistant = session.complete_turn(fallback_result());
        self.publish(&session);
        assistant
    }

    fn publish(&self, session: &Session) {
        self.snapshots.send_replace(session.snapshot());
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
