//! Evidence gate: decides whether generated output may be released.
//!
//! The gate is pure and stateless. A generation pass calls
//! [`enforce_evidence`] with its retrieval facts; the outcome is a typed
//! [`EnforcementResult`], never an error. [`StreamGateDecision`] is the
//! immutable audit record built once per pass, and [`BufferedStreamer`]
//! holds partial output under a bounded budget while a hold is open.

pub mod buffer;
pub mod decision;
pub mod enforcement;

pub use buffer::BufferedStreamer;
pub use decision::{GateVerdict, StreamGateDecision};
pub use enforcement::{
    EnforcementAction, EnforcementResult, EvidenceRef, REASON_EVIDENCE_REQUIRED_MISSING,
    enforce_evidence,
};
