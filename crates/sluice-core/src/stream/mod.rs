//! Real-time event streamer: a push-style, resumable delivery channel built
//! on top of a pull-only event log.
//!
//! One [`EventStreamer`](streamer::EventStreamer) runs per client connection.
//! It replays history from the client's cursor, then tails new events with an
//! adaptive poll interval, emitting [`StreamFrame`](frame::StreamFrame)s in
//! non-decreasing `seq` order.

pub mod frame;
pub mod streamer;

pub use frame::{RECONNECT_EVENT_LIMIT, StreamFrame};
pub use streamer::{EventStreamer, StreamStats};
