//! Hold records and lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::StreamGateDecision;

/// Reason codes recorded on hold transitions.
pub mod reason {
    /// The session opened a newer hold, cancelling this one.
    pub const CANCELLED_BY_NEW_REQUEST: &str = "cancelled_by_new_request";
    /// A waiter's deadline elapsed before the hold resolved.
    pub const HOLD_TIMEOUT: &str = "STREAM_GATE_HOLD_TIMEOUT";
    /// The hold id was not known to the controller.
    pub const HOLD_NOT_FOUND: &str = "hold_not_found";
    /// Default reason for an explicit cancel.
    pub const CANCELLED: &str = "cancelled";
}

/// Lifecycle state of a hold.
///
/// `Holding → {Ready, Timeout, Cancelled}`; `Ready → {Released, Cancelled}`;
/// `Released`, `Timeout` and `Cancelled` are absorbing. There is no idle
/// state: a hold is only ever created in `Holding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    /// Output is withheld pending evidence.
    Holding,
    /// Evidence arrived; output may be released.
    Ready,
    /// Output was released (terminal).
    Released,
    /// The hold expired before resolving (terminal).
    Timeout,
    /// The hold was cancelled (terminal).
    Cancelled,
}

impl HoldState {
    /// Returns the wire/audit string for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldState::Holding => "holding",
            HoldState::Ready => "ready",
            HoldState::Released => "released",
            HoldState::Timeout => "timeout",
            HoldState::Cancelled => "cancelled",
        }
    }

    /// True for absorbing states that never transition again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, HoldState::Released | HoldState::Timeout | HoldState::Cancelled)
    }

    /// True while the hold counts as the session's active hold.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, HoldState::Holding | HoldState::Ready)
    }

    /// True once a waiter blocked in `wait_ready` should wake up.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, HoldState::Ready) || self.is_terminal()
    }
}

/// A per-session hold on output release.
///
/// Snapshots of this record are what every controller operation returns;
/// lifecycle races (unknown id, already-terminal hold) resolve to ordinary
/// snapshots, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hold {
    /// Unique hold identifier.
    pub hold_id: String,
    /// Session the hold belongs to.
    pub session_id: String,
    /// Generation run that opened the hold.
    pub run_id: String,
    /// Current lifecycle state.
    pub state: HoldState,
    /// Reason code for the latest transition, if any.
    pub reason_code: Option<String>,
    /// Gate decision the hold was opened with.
    pub gate_decision: Option<StreamGateDecision>,
    /// Evidence delivered by `mark_ready`, if any.
    pub evidence_payload: Option<serde_json::Value>,
    /// When the hold was created.
    pub created_at: DateTime<Utc>,
    /// When the hold last transitioned.
    pub updated_at: DateTime<Utc>,
}

impl Hold {
    /// Creates a new hold in `Holding`.
    #[must_use]
    pub(crate) fn new(
        hold_id: String,
        session_id: String,
        run_id: String,
        gate_decision: StreamGateDecision,
    ) -> Self {
        let now = Utc::now();
        Self {
            hold_id,
            session_id,
            run_id,
            state: HoldState::Holding,
            reason_code: None,
            gate_decision: Some(gate_decision),
            evidence_payload: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Synthetic result for operations on an unknown hold id.
    #[must_use]
    pub(crate) fn not_found(hold_id: &str) -> Self {
        let now = Utc::now();
        Self {
            hold_id: hold_id.to_string(),
            session_id: String::new(),
            run_id: String::new(),
            state: HoldState::Cancelled,
            reason_code: Some(reason::HOLD_NOT_FOUND.to_string()),
            gate_decision: None,
            evidence_payload: None,
            created_at: now,
            updated_at: now,
        }
    }
}
