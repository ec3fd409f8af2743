//! Wire frames for the event stream.

use serde_json::json;
use sluice_abstraction::TaskEvent;

/// Reason carried by a reconnect frame when the stream-lifetime event cap is
/// reached.
pub const RECONNECT_EVENT_LIMIT: &str = "event_limit_reached";

/// One message on the stream wire.
///
/// Data and control frames encode as `data: {json}\n\n`; keepalives are
/// comment lines starting with `:`. Control frames carry a `type` key and the
/// last delivered `seq` so a client can resume without gaps.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A single task event.
    Data(TaskEvent),
    /// Comment frame keeping the connection alive.
    Keepalive,
    /// The stream hit its lifetime event cap; the client should reconnect
    /// from `last_seq`.
    Reconnect {
        /// Sequence number of the last emitted event.
        last_seq: u64,
        /// Why the server is asking for a reconnect.
        reason: String,
    },
    /// Terminal error frame; the stream ends after this.
    Error {
        /// Last sequence number known to have been delivered.
        last_seq: u64,
        /// Human-readable error description.
        error: String,
    },
}

impl StreamFrame {
    /// Encodes the frame in wire format.
    ///
    /// # Errors
    /// Returns an error if the event payload cannot be serialized.
    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            StreamFrame::Data(event) => {
                let body = serde_json::to_string(event)?;
                Ok(format!("data: {body}\n\n"))
            }
            StreamFrame::Keepalive => Ok(": keepalive\n\n".to_string()),
            StreamFrame::Reconnect { last_seq, reason } => {
                let body = json!({
                    "type": "reconnect",
                    "last_seq": last_seq,
                    "reason": reason,
                });
                Ok(format!("data: {body}\n\n"))
            }
            StreamFrame::Error { last_seq, error } => {
                let body = json!({
                    "type": "error",
                    "last_seq": last_seq,
                    "error": error,
                });
                Ok(format!("data: {body}\n\n"))
            }
        }
    }

    /// True for data frames.
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, StreamFrame::Data(_))
    }
}
