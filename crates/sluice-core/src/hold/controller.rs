//! Session-keyed hold controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gate::StreamGateDecision;
use crate::hold::state::{Hold, HoldState, reason};

/// One tracked hold plus its wakeup channel.
struct HoldEntry {
    hold: Hold,
    /// Waiters subscribe to this; every transition publishes the new state.
    notify: watch::Sender<HoldState>,
}

/// Hold records and the session index, guarded together so "cancel old,
/// install new" is atomic.
#[derive(Default)]
struct HoldTable {
    holds: HashMap<String, HoldEntry>,
    by_session: HashMap<String, String>,
}

impl HoldTable {
    /// Applies a transition and wakes any waiters. Caller checks terminality.
    fn transition(&mut self, hold_id: &str, state: HoldState, reason_code: Option<String>) {
        if let Some(entry) = self.holds.get_mut(hold_id) {
            entry.hold.state = state;
            if reason_code.is_some() {
                entry.hold.reason_code = reason_code;
            }
            entry.hold.updated_at = chrono::Utc::now();
            let _ = entry.notify.send(state);
        }
    }

    /// Drops the session pointer if it still points at this hold.
    fn clear_session_pointer(&mut self, hold: &Hold) {
        if self.by_session.get(&hold.session_id).is_some_and(|id| id == &hold.hold_id) {
            self.by_session.remove(&hold.session_id);
        }
    }
}

/// Arbitrates, per session, whether output is currently withheld.
///
/// At most one hold per session is active (`Holding` or `Ready`) at any time;
/// opening a new hold cancels the previous active one. All state lives behind
/// a single monitor; `wait_ready` is the only blocking operation and suspends
/// on a watch channel bounded by its deadline, never inside the lock.
///
/// The controller is explicitly constructed and injected by the hosting
/// process; there is no ambient global instance.
#[derive(Clone, Default)]
pub struct HoldController {
    table: Arc<Mutex<HoldTable>>,
}

impl HoldController {
    /// Creates an empty controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HoldTable> {
        self.table.lock().expect("hold table lock poisoned")
    }

    /// Opens a new hold for a session, cancelling any active one.
    ///
    /// # Arguments
    /// * `session_id` - Session the output belongs to
    /// * `run_id` - Generation run opening the hold
    /// * `gate_decision` - Gate decision the hold carries while waiting
    ///
    /// # Returns
    /// The fresh hold id. The hold starts in `Holding`.
    pub fn begin_hold(
        &self,
        session_id: &str,
        run_id: &str,
        gate_decision: StreamGateDecision,
    ) -> String {
        let mut table = self.lock();

        // A session may carry only one active hold: cancel the old one first.
        if let Some(old_id) = table.by_session.get(session_id).cloned() {
            let old_active =
                table.holds.get(&old_id).is_some_and(|entry| entry.hold.state.is_active());
            if old_active {
                warn!(session_id = %session_id, hold_id = %old_id, "Cancelling superseded hold");
                table.transition(
                    &old_id,
                    HoldState::Cancelled,
                    Some(reason::CANCELLED_BY_NEW_REQUEST.to_string()),
                );
            }
        }

        let hold_id = Uuid::new_v4().to_string();
        let hold =
            Hold::new(hold_id.clone(), session_id.to_string(), run_id.to_string(), gate_decision);
        let (notify, _) = watch::channel(HoldState::Holding);
        table.holds.insert(hold_id.clone(), HoldEntry { hold, notify });
        table.by_session.insert(session_id.to_string(), hold_id.clone());

        info!(session_id = %session_id, run_id = %run_id, hold_id = %hold_id, "Opened hold");
        hold_id
    }

    /// Returns the session's hold id if it is still active.
    ///
    /// Stale pointers left behind by terminal holds are cleared lazily here.
    pub fn active_hold_for_session(&self, session_id: &str) -> Option<String> {
        let mut table = self.lock();
        let hold_id = table.by_session.get(session_id)?.clone();
        let active = table.holds.get(&hold_id).is_some_and(|entry| entry.hold.state.is_active());
        if active {
            Some(hold_id)
        } else {
            table.by_session.remove(session_id);
            None
        }
    }

    /// Returns the current state of a hold, if known.
    pub fn hold_state(&self, hold_id: &str) -> Option<HoldState> {
        self.lock().holds.get(hold_id).map(|entry| entry.hold.state)
    }

    /// Blocks until the hold settles (`Ready` or terminal) or the deadline
    /// elapses, whichever comes first.
    ///
    /// On timeout the hold itself transitions to `Timeout` with reason
    /// `STREAM_GATE_HOLD_TIMEOUT` before the snapshot is returned. An unknown
    /// id yields a synthetic `Cancelled` snapshot with reason
    /// `hold_not_found` rather than an error.
    pub async fn wait_ready(&self, hold_id: &str, timeout: Duration) -> Hold {
        let mut rx = {
            let table = self.lock();
            match table.holds.get(hold_id) {
                None => return Hold::not_found(hold_id),
                Some(entry) if entry.hold.state.is_settled() => return entry.hold.clone(),
                Some(entry) => entry.notify.subscribe(),
            }
        };

        // The watch borrow must be dropped before re-taking the table lock: a
        // notifier inside the lock blocks on the watch write side.
        enum WaitOutcome {
            Settled,
            Gone,
            Deadline,
        }
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(HoldState::is_settled)).await
        {
            Ok(Ok(_)) => WaitOutcome::Settled,
            Ok(Err(_)) => WaitOutcome::Gone,
            Err(_) => WaitOutcome::Deadline,
        };
        drop(rx);

        let mut table = self.lock();
        match outcome {
            // Woken by a transition (or the hold settled before we subscribed).
            WaitOutcome::Settled => {}
            // Notifier dropped: the entry vanished from the table.
            WaitOutcome::Gone => {
                debug!(hold_id = %hold_id, "Hold removed while waiting");
                return Hold::not_found(hold_id);
            }
            // Deadline elapsed first.
            WaitOutcome::Deadline => {
                let still_holding = table
                    .holds
                    .get(hold_id)
                    .is_some_and(|entry| entry.hold.state == HoldState::Holding);
                if still_holding {
                    info!(hold_id = %hold_id, "Hold wait timed out");
                    table.transition(
                        hold_id,
                        HoldState::Timeout,
                        Some(reason::HOLD_TIMEOUT.to_string()),
                    );
                }
            }
        }

        let snapshot = match table.holds.get(hold_id) {
            Some(entry) => entry.hold.clone(),
            None => return Hold::not_found(hold_id),
        };
        if !snapshot.state.is_active() {
            table.clear_session_pointer(&snapshot);
        }
        snapshot
    }

    /// Delivers evidence to a hold, transitioning it to `Ready` and waking
    /// all waiters. A hold already in a terminal state is left untouched and
    /// its existing snapshot returned.
    pub fn mark_ready(&self, hold_id: &str, evidence_payload: serde_json::Value) -> Hold {
        let mut table = self.lock();
        let Some(entry) = table.holds.get_mut(hold_id) else {
            return Hold::not_found(hold_id);
        };
        if entry.hold.state.is_terminal() {
            debug!(hold_id = %hold_id, state = entry.hold.state.as_str(), "mark_ready on settled hold");
            return entry.hold.clone();
        }

        entry.hold.evidence_payload = Some(evidence_payload);
        table.transition(hold_id, HoldState::Ready, None);
        info!(hold_id = %hold_id, "Hold ready");
        table.holds.get(hold_id).map_or_else(|| Hold::not_found(hold_id), |e| e.hold.clone())
    }

    /// Releases a hold, ending the withholding of output.
    ///
    /// Terminal holds are left untouched; otherwise the hold moves to
    /// `Released` and the session's active-hold pointer is cleared if it
    /// still points here.
    pub fn release(&self, hold_id: &str, reason_code: Option<String>) -> Hold {
        self.finish(hold_id, HoldState::Released, reason_code)
    }

    /// Cancels a hold.
    ///
    /// Terminal holds are left untouched; otherwise the hold moves to
    /// `Cancelled` (default reason `cancelled`) and the session pointer is
    /// cleared.
    pub fn cancel(&self, hold_id: &str, reason_code: Option<String>) -> Hold {
        let reason_code = reason_code.or_else(|| Some(reason::CANCELLED.to_string()));
        self.finish(hold_id, HoldState::Cancelled, reason_code)
    }

    fn finish(&self, hold_id: &str, state: HoldState, reason_code: Option<String>) -> Hold {
        let mut table = self.lock();
        let Some(entry) = table.holds.get(hold_id) else {
            return Hold::not_found(hold_id);
        };
        if entry.hold.state.is_terminal() {
            return entry.hold.clone();
        }

        table.transition(hold_id, state, reason_code);
        info!(hold_id = %hold_id, state = state.as_str(), "Hold finished");
        let snapshot = match table.holds.get(hold_id) {
            Some(entry) => entry.hold.clone(),
            None => return Hold::not_found(hold_id),
        };
        table.clear_session_pointer(&snapshot);
        snapshot
    }
}
