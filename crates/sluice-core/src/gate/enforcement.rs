//! Evidence enforcement policy.

use serde::{Deserialize, Serialize};

/// Reason code attached to every evidence-policy violation.
pub const REASON_EVIDENCE_REQUIRED_MISSING: &str = "EVIDENCE_REQUIRED_MISSING";

/// Fixed refusal text returned when an ungrounded response is rejected.
const REJECT_TEXT: &str = "I can't release this response: it relies on retrieved \
    knowledge but carries no citations. Please re-run with evidence references \
    attached, or cite the sources the claim is based on.";

/// Fixed replacement text returned when an ungrounded response is degraded.
const DEGRADE_TEXT: &str = "I won't assert this claim because I found no \
    supporting evidence for it. Treat the following as unverified and consult \
    the knowledge base directly before relying on it.";

/// A structured citation backing a grounded claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Identifier of the source document.
    pub source_id: String,
    /// URI of the source.
    pub uri: String,
    /// Locator within the source (page, anchor, byte range, ...).
    pub locator: Option<String>,
    /// Content hash of the cited material.
    pub content_hash: Option<String>,
}

impl EvidenceRef {
    /// Creates a citation with just a source id and URI.
    #[must_use]
    pub fn new(source_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), uri: uri.into(), locator: None, content_hash: None }
    }

    /// Sets the locator within the source.
    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Sets the content hash.
    #[must_use]
    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = Some(content_hash.into());
        self
    }
}

/// Action taken when output is evaluated against evidence policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    /// No enforcement needed.
    None,
    /// Response is blocked and replaced by a refusal.
    Reject,
    /// Response is replaced by a softened, non-asserting text.
    Degrade,
    /// Response passes but must be audit-tagged by the caller.
    Mark,
}

impl EnforcementAction {
    /// Returns the wire/audit string for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::None => "none",
            EnforcementAction::Reject => "reject",
            EnforcementAction::Degrade => "degrade",
            EnforcementAction::Mark => "mark",
        }
    }
}

/// Outcome of one evidence-policy evaluation. Produced fresh per call and
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementResult {
    /// Whether the response may be delivered (possibly degraded or marked).
    pub ok: bool,
    /// The action the gate took.
    pub action_taken: EnforcementAction,
    /// Reason code, set on every violation.
    pub reason_code: Option<String>,
    /// Replacement text, set for reject and degrade.
    pub sanitized_response: Option<String>,
}

impl EnforcementResult {
    fn pass() -> Self {
        Self {
            ok: true,
            action_taken: EnforcementAction::None,
            reason_code: None,
            sanitized_response: None,
        }
    }
}

/// Default enforcement action for a deployment mode.
///
/// Locked-down and externally exposed deployments reject ungrounded output;
/// everything else (including unknown modes) falls back to marking.
fn default_action_for_mode(mode: &str) -> EnforcementAction {
    match mode {
        "local_locked" | "remote_exposed" => EnforcementAction::Reject,
        _ => EnforcementAction::Mark,
    }
}

/// Evaluates a generated response against evidence policy.
///
/// Pure function, no I/O. Output produced without retrieved knowledge
/// (`used_kb == false`) is never gated; output produced with retrieval and at
/// least one citation passes; otherwise the explicit `action` override, or
/// the mode default, decides whether the response is rejected, degraded, or
/// marked for audit.
///
/// # Arguments
/// * `mode` - Deployment mode string (`local_open`, `local_locked`, `remote_exposed`, ...)
/// * `used_kb` - Whether the response was produced using retrieved knowledge
/// * `evidence_refs` - Citations attached to the response
/// * `action` - Optional explicit action override
#[must_use]
pub fn enforce_evidence(
    mode: &str,
    used_kb: bool,
    evidence_refs: &[EvidenceRef],
    action: Option<EnforcementAction>,
) -> EnforcementResult {
    if !used_kb {
        // No grounding claim to enforce.
        return EnforcementResult::pass();
    }
    if !evidence_refs.is_empty() {
        return EnforcementResult::pass();
    }

    let action = action.unwrap_or_else(|| default_action_for_mode(mode));
    match action {
        EnforcementAction::None | EnforcementAction::Mark => EnforcementResult {
            ok: true,
            action_taken: EnforcementAction::Mark,
            reason_code: Some(REASON_EVIDENCE_REQUIRED_MISSING.to_string()),
            sanitized_response: None,
        },
        EnforcementAction::Reject => EnforcementResult {
            ok: false,
            action_taken: EnforcementAction::Reject,
            reason_code: Some(REASON_EVIDENCE_REQUIRED_MISSING.to_string()),
            sanitized_response: Some(REJECT_TEXT.to_string()),
        },
        EnforcementAction::Degrade => EnforcementResult {
            ok: true,
            action_taken: EnforcementAction::Degrade,
            reason_code: Some(REASON_EVIDENCE_REQUIRED_MISSING.to_string()),
            sanitized_response: Some(DEGRADE_TEXT.to_string()),
        },
    }
}
