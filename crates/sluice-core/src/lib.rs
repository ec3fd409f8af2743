//! Sluice Core - Governed, resumable streaming of agent output.
//!
//! This crate provides the three coordination primitives of the platform:
//! - Hold controller: pauses release of output per session pending evidence,
//!   with blocking wait, timeout, and cancellation semantics
//! - Evidence gate: decides allow/hold/reject for output produced with
//!   retrieved knowledge, and buffers withheld output under a bounded budget
//! - Event streamer: turns a pull-only event log into a push-style,
//!   resumable, backpressure-aware delivery channel
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sluice_abstraction::MemoryEventSource;
//! use sluice_core::{Config, EventStreamer};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let source = Arc::new(MemoryEventSource::new());
//!     let streamer = EventStreamer::new(source, "task-1", config.streamer);
//!     let (tx, mut rx) = mpsc::channel(64);
//!     tokio::spawn(async move { streamer.run(0, tx).await });
//!     while let Some(frame) = rx.recv().await {
//!         print!("{}", frame.encode().expect("frame encodes"));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod hold;
pub mod stream;

pub use config::{Config, GateConfig, StreamerConfig};
pub use error::{Result, SluiceError};
pub use gate::{
    BufferedStreamer, EnforcementAction, EnforcementResult, EvidenceRef, GateVerdict,
    REASON_EVIDENCE_REQUIRED_MISSING, StreamGateDecision, enforce_evidence,
};
pub use hold::{Hold, HoldController, HoldState};
pub use stream::{EventStreamer, RECONNECT_EVENT_LIMIT, StreamFrame, StreamStats};
