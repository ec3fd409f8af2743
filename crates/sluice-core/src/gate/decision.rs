//! Immutable audit record of one gate evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::enforcement::EnforcementAction;

/// Gate verdict for one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateVerdict {
    /// Output may be released immediately.
    Allow,
    /// Output is withheld pending asynchronous evidence.
    Hold,
    /// Output is blocked.
    Reject,
}

impl GateVerdict {
    /// Returns the wire/audit string for this verdict.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GateVerdict::Allow => "allow",
            GateVerdict::Hold => "hold",
            GateVerdict::Reject => "reject",
        }
    }
}

/// Immutable, timestamped snapshot of a gate evaluation.
///
/// Created once per generation pass via [`StreamGateDecision::build`]; this
/// is the audit artifact a hold carries while waiting, and the unit persisted
/// externally. Fields are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamGateDecision {
    /// The verdict.
    pub verdict: GateVerdict,
    /// Reason code for hold/reject verdicts.
    pub reason_code: Option<String>,
    /// Whether retrieved knowledge was used for this pass.
    pub used_kb: bool,
    /// Retrieval run that supplied the evidence, if any.
    pub retrieval_run_id: Option<String>,
    /// Hash of the policy snapshot the decision was made under.
    pub policy_snapshot_hash: Option<String>,
    /// Number of evidence references attached.
    pub evidence_count: usize,
    /// Deployment mode the decision was made in.
    pub mode: String,
    /// Enforcement action taken.
    pub action_taken: EnforcementAction,
    /// Output text captured with the decision, if any.
    pub output_text: Option<String>,
    /// When the decision was made.
    pub decided_at: DateTime<Utc>,
}

impl StreamGateDecision {
    /// Builds a decision record, stamping the current time.
    ///
    /// # Arguments
    /// * `verdict` - The gate verdict
    /// * `mode` - Deployment mode string
    /// * `used_kb` - Whether retrieval was used
    /// * `action_taken` - Enforcement action taken
    #[must_use]
    pub fn build(
        verdict: GateVerdict,
        mode: impl Into<String>,
        used_kb: bool,
        action_taken: EnforcementAction,
    ) -> Self {
        Self {
            verdict,
            reason_code: None,
            used_kb,
            retrieval_run_id: None,
            policy_snapshot_hash: None,
            evidence_count: 0,
            mode: mode.into(),
            action_taken,
            output_text: None,
            decided_at: Utc::now(),
        }
    }

    /// Sets the reason code.
    #[must_use]
    pub fn with_reason(mut self, reason_code: impl Into<String>) -> Self {
        self.reason_code = Some(reason_code.into());
        self
    }

    /// Sets the retrieval run and evidence count.
    #[must_use]
    pub fn with_retrieval(mut self, retrieval_run_id: impl Into<String>, evidence_count: usize) -> Self {
        self.retrieval_run_id = Some(retrieval_run_id.into());
        self.evidence_count = evidence_count;
        self
    }

    /// Sets the policy snapshot hash.
    #[must_use]
    pub fn with_policy_hash(mut self, policy_snapshot_hash: impl Into<String>) -> Self {
        self.policy_snapshot_hash = Some(policy_snapshot_hash.into());
        self
    }

    /// Attaches the output text the decision applies to.
    #[must_use]
    pub fn with_output_text(mut self, output_text: impl Into<String>) -> Self {
        self.output_text = Some(output_text.into());
        self
    }
}
