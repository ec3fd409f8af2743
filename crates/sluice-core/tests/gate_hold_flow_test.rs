//! End-to-end flow of a gated generation pass: evaluate evidence policy,
//! open a hold, buffer partial output, resolve, and release.

use std::time::Duration;

use serde_json::json;
use sluice_core::gate::{
    BufferedStreamer, EnforcementAction, GateVerdict, StreamGateDecision, enforce_evidence,
};
use sluice_core::hold::{HoldController, HoldState};
use sluice_core::{Config, EvidenceRef, REASON_EVIDENCE_REQUIRED_MISSING};

#[tokio::test]
async fn test_hold_buffer_release_flow() -> anyhow::Result<()> {
    let config = Config::default();
    let controller = HoldController::new();

    // Generation pass: retrieval was used but evidence has not arrived yet.
    let result = enforce_evidence("local_open", true, &[], None);
    assert!(result.ok);
    assert_eq!(result.action_taken, EnforcementAction::Mark);

    let decision = StreamGateDecision::build(GateVerdict::Hold, "local_open", true, result.action_taken)
        .with_reason(REASON_EVIDENCE_REQUIRED_MISSING)
        .with_retrieval("run-7", 0)
        .with_policy_hash("sha256:feed");
    let hold_id = controller.begin_hold("session-1", "run-7", decision);

    // Output keeps arriving while the hold is open; buffer it under budget.
    let mut buffer = BufferedStreamer::new(config.gate.max_buffer_chars);
    assert!(buffer.append("The capital of "));
    assert!(buffer.append("Australia is Canberra."));

    // Evidence arrives asynchronously and resolves the hold.
    let waiter = {
        let controller = controller.clone();
        let hold_id = hold_id.clone();
        tokio::spawn(async move { controller.wait_ready(&hold_id, Duration::from_secs(30)).await })
    };
    tokio::task::yield_now().await;
    controller.mark_ready(
        &hold_id,
        json!({"evidence": [EvidenceRef::new("doc-1", "kb://doc-1").with_locator("s2")]}),
    );

    let resolved = waiter.await?;
    assert_eq!(resolved.state, HoldState::Ready);
    assert!(resolved.evidence_payload.is_some());

    // The coordinator flushes the withheld output and closes the hold.
    let chunks = buffer.flush();
    assert_eq!(chunks.concat(), "The capital of Australia is Canberra.");
    assert!(buffer.is_empty());

    let released = controller.release(&hold_id, Some("delivered".to_string()));
    assert_eq!(released.state, HoldState::Released);
    assert_eq!(controller.active_hold_for_session("session-1"), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reject_path_skips_hold_entirely() {
    let controller = HoldController::new();

    // Exposed deployments reject ungrounded output outright: no hold opens.
    let result = enforce_evidence("remote_exposed", true, &[], None);
    assert!(!result.ok);
    assert_eq!(result.action_taken, EnforcementAction::Reject);
    let refusal = result.sanitized_response.expect("reject carries a refusal");
    assert!(!refusal.is_empty());
    assert_eq!(controller.active_hold_for_session("session-1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_path_degrades_delivery() {
    let controller = HoldController::new();
    let decision =
        StreamGateDecision::build(GateVerdict::Hold, "local_open", true, EnforcementAction::Mark);
    let hold_id = controller.begin_hold("session-1", "run-1", decision);

    let mut buffer = BufferedStreamer::new(64);
    assert!(buffer.append("partial answer"));

    // Evidence never shows up; the wait resolves to timeout.
    let hold = controller.wait_ready(&hold_id, Duration::from_secs(2)).await;
    assert_eq!(hold.state, HoldState::Timeout);

    // Buffered output is still retrievable for a degraded delivery.
    assert_eq!(buffer.flush(), vec!["partial answer".to_string()]);
}
