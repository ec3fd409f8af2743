//! Hold controller: per-session arbitration of withheld output.
//!
//! A hold blocks release of generated output for one session until evidence
//! arrives, the hold times out, or it is cancelled. The controller owns all
//! hold state behind a single monitor; see [`HoldController`].

pub mod controller;
pub mod state;

pub use controller::HoldController;
pub use state::{Hold, HoldState, reason};
