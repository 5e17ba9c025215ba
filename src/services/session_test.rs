use super::*;
use crate::attachment::FileCategory;
use crate::llm::types::{ChatResponse, ContentBlock, LlmError, Message as LlmMessage, StructuredOutput};
use crate::services::analysis::fallback_result;
use crate::transcript::{Author, StepCategory};
use std::time::Duration;
use tokio::sync::Notify;

// =========================================================================
// GatedLlm
// =========================================================================

/// Holds every call until the gate is opened, then answers with a one-step
/// report so model and fallback results can be told apart.
struct GatedLlm {
    gate: Arc<Notify>,
}

#[async_trait::async_trait]
impl LlmChat for GatedLlm {
    async fn chat(
        &self,
        _max_tokens: u32,
        _system: &str,
        _messages: &[LlmMessage],
        _output: Option<&StructuredOutput>,
    ) -> Result<ChatResponse, LlmError> {
        self.gate.notified().await;
        let report = serde_json::json!({
            "reasoning": "门控回复",
            "steps": [{ "title": "成本", "content": "打样", "type": "cost" }]
        });
        Ok(ChatResponse {
            content: vec![ContentBlock::Text { text: report.to_string() }],
            model: "gated".into(),
            stop_reason: "end_turn".into(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

fn gated() -> (SessionHandle, Arc<Notify>) {
    let gate = Arc::new(Notify::new());
    let llm: Arc<dyn LlmChat> = Arc::new(GatedLlm { gate: gate.clone() });
    (SessionHandle::new(Some(llm)), gate)
}

// =========================================================================
// Session (plain state)
// =========================================================================

#[test]
fn blank_prompt_without_files_is_ignored() {
    let mut session = Session::new();
    assert_eq!(session.begin_turn("   ").unwrap_err(), IgnoreReason::EmptyInput);
    assert!(session.transcript().is_empty());
    assert_eq!(session.phase(), TurnPhase::Idle);
}

#[test]
fn files_alone_start_a_turn() {
    let mut session = Session::new();
    session.attach(&[RawFile::new("gerber.zip", 2048)]);
    let turn = session.begin_turn("").unwrap();
    assert_eq!(turn.user.text, "");
    assert_eq!(turn.attachments.len(), 1);
    assert_eq!(turn.attachments[0].category, FileCategory::Gerber);
    assert!(session.pending().is_empty());
}

#[test]
fn begin_turn_moves_to_awaiting_and_rejects_reentry() {
    let mut session = Session::new();
    session.begin_turn("报价").unwrap();
    assert_eq!(session.phase(), TurnPhase::Awaiting);
    assert!(session.is_busy());

    session.attach(&[RawFile::new("bom.csv", 1)]);
    assert_eq!(session.begin_turn("再来").unwrap_err(), IgnoreReason::Busy);
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.pending().len(), 1);
}

#[test]
fn complete_turn_appends_assistant_and_returns_to_idle() {
    let mut session = Session::new();
    session.begin_turn("报价").unwrap();
    let assistant = session.complete_turn(fallback_result());
    assert_eq!(assistant.author, Author::Assistant);
    assert_eq!(assistant.text, fallback_result().reasoning);
    assert_eq!(session.phase(), TurnPhase::Idle);
    assert_eq!(session.transcript().len(), 2);
}

#[test]
fn prompt_is_trimmed_on_the_user_message() {
    let mut session = Session::new();
    let turn = session.begin_turn("  六层板  ").unwrap();
    assert_eq!(turn.user.text, "六层板");
    assert_eq!(turn.prompt, "六层板");
}

#[test]
fn snapshot_reflects_state() {
    let mut session = Session::new();
    session.attach(&[RawFile::new("a.rar", 1024)]);
    let snap = session.snapshot();
    assert!(snap.messages.is_empty());
    assert!(!snap.busy);
    assert_eq!(snap.pending[0].size_label, "1.0KB");
}

// =========================================================================
// SessionHandle
// =========================================================================

#[tokio::test]
async fn quotation_turn_without_client_uses_fallback() {
    let handle = SessionHandle::new(None);
    handle.attach(&[RawFile::new("bom.xlsx", 10_240)]).await;

    let outcome = handle.send("分析此4层板报价").await;
    let TurnOutcome::Answered { user, assistant, source } = outcome else {
        panic!("expected answered turn");
    };
    assert_eq!(user.attachments[0].name, "bom.xlsx");
    assert_eq!(source, AnalysisSource::Fallback { code: "E_LLM_NOT_CONFIGURED" });

    let snap = handle.snapshot().await;
    assert_eq!(snap.messages.len(), 2);
    assert!(!snap.busy);
    assert!(snap.pending.is_empty());

    let analysis = assistant.analysis.unwrap();
    assert!(!analysis.reasoning.is_empty());
    let categories: Vec<StepCategory> = analysis.steps.iter().map(|s| s.category).collect();
    assert_eq!(categories, StepCategory::ALL);
}

#[tokio::test]
async fn empty_send_leaves_transcript_unchanged() {
    let handle = SessionHandle::new(None);
    let outcome = handle.send("").await;
    assert!(matches!(outcome, TurnOutcome::Ignored { reason: IgnoreReason::EmptyInput }));
    assert!(handle.snapshot().await.messages.is_empty());
}

#[tokio::test]
async fn second_send_while_awaiting_is_ignored() {
    let (handle, gate) = gated();
    let mut rx = handle.subscribe();

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.send("第一轮").await }
    });

    rx.wait_for(|s| s.busy).await.unwrap();
    let second = handle.send("第二轮").await;
    assert!(matches!(second, TurnOutcome::Ignored { reason: IgnoreReason::Busy }));
    assert_eq!(handle.snapshot().await.messages.len(), 1);

    gate.notify_one();
    let outcome = first.await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Answered { source: AnalysisSource::Model { .. }, .. }));

    let snap = handle.snapshot().await;
    assert_eq!(snap.messages.len(), 2);
    assert_eq!(snap.messages[1].text, "门控回复");
    assert!(!snap.busy);
}

#[tokio::test]
async fn user_message_is_published_before_resolution() {
    let (handle, gate) = gated();
    let mut rx = handle.subscribe();

    let turn = tokio::spawn({
        let handle = handle.clone();
        async move { handle.send("报价").await }
    });

    let snap = rx.wait_for(|s| s.busy).await.unwrap().clone();
    assert_eq!(snap.messages.len(), 1);
    assert_eq!(snap.messages[0].author, Author::User);

    gate.notify_one();
    turn.await.unwrap();
    let snap = rx.wait_for(|s| !s.busy).await.unwrap().clone();
    assert_eq!(snap.messages.len(), 2);
}

#[tokio::test]
async fn dropped_caller_does_not_strand_the_turn() {
    let (handle, gate) = gated();
    let mut rx = handle.subscribe();

    let abandoned = tokio::time::timeout(Duration::from_millis(50), handle.send("第一轮")).await;
    assert!(abandoned.is_err());
    assert!(handle.snapshot().await.busy);

    gate.notify_one();
    let snap = rx.wait_for(|s| !s.busy).await.unwrap().clone();
    assert_eq!(snap.messages.len(), 2);
    assert_eq!(snap.messages[1].text, "门控回复");

    gate.notify_one();
    let next = handle.send("第二轮").await;
    assert!(matches!(next, TurnOutcome::Answered { source: AnalysisSource::Model { .. }, .. }));
    assert_eq!(handle.snapshot().await.messages.len(), 4);
}

#[tokio::test]
async fn attachment_edits_publish_snapshots() {
    let handle = SessionHandle::new(None);
    let rx = handle.subscribe();

    let pending = handle.attach(&[RawFile::new("a.zip", 1), RawFile::new("b.csv", 1)]).await;
    assert_eq!(pending.len(), 2);
    assert_eq!(rx.borrow().pending.len(), 2);

    let pending = handle.remove_attachment(7).await;
    assert_eq!(pending.len(), 2);

    let pending = handle.remove_attachment(0).await;
    assert_eq!(pending[0].name, "b.csv");

    assert!(handle.clear_attachments().await.is_empty());
    assert!(rx.borrow().pending.is_empty());
}

#[test]
fn outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(TurnOutcome::Ignored { reason: IgnoreReason::Busy }).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "ignored", "reason": "busy" }));
}
