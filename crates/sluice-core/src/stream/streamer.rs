//! Poll-to-push adapter over a pull-only event log.

use std::sync::Arc;
use std::time::Duration;

use sluice_abstraction::{EventSource, EventSourceError, TaskEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::config::StreamerConfig;
use crate::stream::frame::{RECONNECT_EVENT_LIMIT, StreamFrame};

/// Final accounting for one stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Number of data frames emitted over the stream's lifetime.
    pub events_sent: u64,
    /// Sequence number of the last event delivered.
    pub last_seq: u64,
}

/// Per-connection mutable state. Created when the connection opens,
/// discarded when it closes; never shared between streamers.
struct StreamState {
    last_seq: u64,
    events_sent: u64,
    buffer: Vec<TaskEvent>,
    poll_interval: Duration,
    last_flush: Instant,
    last_keepalive: Instant,
}

/// Delivers an ordered, gap-free, resumable event sequence for one task over
/// a long-lived push channel.
///
/// The streamer first replays history from the client's cursor (phase 1),
/// then tails new events (phase 2) with an adaptive poll interval: idle
/// iterations widen the interval by `poll_backoff_factor` up to
/// `max_poll_interval`; any new event resets it instantly to the floor.
/// Frames are always emitted in non-decreasing `seq`, so a client
/// reconnecting with `since_seq` set to its last seen `seq` receives exactly
/// the missed events.
///
/// Cancellation is the client dropping its receiver: it is observed at the
/// next send or the per-iteration closed check and unwinds the stream without
/// an error frame. Backend failures are logged and surfaced as exactly one
/// terminal error frame.
pub struct EventStreamer {
    source: Arc<dyn EventSource>,
    task_id: String,
    config: StreamerConfig,
}

impl EventStreamer {
    /// Creates a streamer for one task.
    ///
    /// # Arguments
    /// * `source` - Pull-style event backend
    /// * `task_id` - Task whose events are streamed
    /// * `config` - Pacing and backpressure configuration
    #[must_use]
    pub fn new(source: Arc<dyn EventSource>, task_id: impl Into<String>, config: StreamerConfig) -> Self {
        Self { source, task_id: task_id.into(), config }
    }

    /// Runs the stream until the client disconnects, the lifetime event cap
    /// is hit, or the backend fails.
    ///
    /// # Arguments
    /// * `since_seq` - Resumption cursor; `0` streams from the start
    /// * `tx` - Frame channel to the client connection
    pub async fn run(&self, since_seq: u64, tx: mpsc::Sender<StreamFrame>) -> StreamStats {
        let mut state = StreamState {
            last_seq: since_seq,
            events_sent: 0,
            buffer: Vec::new(),
            poll_interval: self.config.poll_interval(),
            last_flush: Instant::now(),
            last_keepalive: Instant::now(),
        };

        if let Err(err) = self.stream(&mut state, &tx).await {
            error!(task_id = %self.task_id, error = %err, last_seq = state.last_seq, "Event stream failed");
            let _ = tx
                .send(StreamFrame::Error { last_seq: state.last_seq, error: err.to_string() })
                .await;
        }

        debug!(
            task_id = %self.task_id,
            events_sent = state.events_sent,
            last_seq = state.last_seq,
            "Event stream ended"
        );
        StreamStats { events_sent: state.events_sent, last_seq: state.last_seq }
    }

    async fn stream(
        &self,
        state: &mut StreamState,
        tx: &mpsc::Sender<StreamFrame>,
    ) -> Result<(), EventSourceError> {
        if !self.catch_up(state, tx).await? {
            return Ok(());
        }
        self.tail(state, tx).await
    }

    /// Phase 1: replay stored history page by page. Returns `false` if the
    /// client went away mid-replay.
    async fn catch_up(
        &self,
        state: &mut StreamState,
        tx: &mpsc::Sender<StreamFrame>,
    ) -> Result<bool, EventSourceError> {
        let page_size = self.config.catchup_page_size;
        loop {
            let page =
                self.source.events_after(&self.task_id, state.last_seq, page_size).await?;
            let page_len = page.len();
            for event in page {
                state.last_seq = event.seq;
                if !send_frame(tx, StreamFrame::Data(event), state).await {
                    return Ok(false);
                }
                state.events_sent += 1;
            }
            if page_len < page_size {
                return Ok(true);
            }
            // Cooperative cancellation point between pages.
            tokio::task::yield_now().await;
        }
    }

    /// Phase 2: tail new events with adaptive pacing.
    async fn tail(
        &self,
        state: &mut StreamState,
        tx: &mpsc::Sender<StreamFrame>,
    ) -> Result<(), EventSourceError> {
        let cfg = &self.config;
        loop {
            // Any flush leaves the buffer empty, so at this point last_seq is
            // the last emitted event's seq.
            if state.events_sent >= cfg.max_events_per_stream {
                debug!(task_id = %self.task_id, last_seq = state.last_seq, "Stream event limit reached");
                let frame = StreamFrame::Reconnect {
                    last_seq: state.last_seq,
                    reason: RECONNECT_EVENT_LIMIT.to_string(),
                };
                let _ = send_frame(tx, frame, state).await;
                return Ok(());
            }
            if tx.is_closed() {
                debug!(task_id = %self.task_id, "Client disconnected");
                return Ok(());
            }

            let events =
                self.source.events_after(&self.task_id, state.last_seq, cfg.batch_size).await?;
            if events.is_empty() {
                state.poll_interval = next_poll_interval(state.poll_interval, cfg);
            } else {
                // New data: reset backoff instantly to the floor.
                state.poll_interval = cfg.poll_interval();
                for event in events {
                    state.last_seq = event.seq;
                    state.buffer.push(event);
                }
                if state.buffer.len() >= cfg.batch_size && !self.flush(state, tx).await {
                    return Ok(());
                }
            }

            // Bound worst-case latency for slow trickles.
            if !state.buffer.is_empty()
                && state.last_flush.elapsed() >= cfg.flush_interval()
                && !self.flush(state, tx).await
            {
                return Ok(());
            }

            if state.last_keepalive.elapsed() >= cfg.keepalive_interval()
                && !send_frame(tx, StreamFrame::Keepalive, state).await
            {
                return Ok(());
            }

            tokio::time::sleep(state.poll_interval).await;
        }
    }

    /// Emits all buffered events. Returns `false` if the client went away.
    async fn flush(&self, state: &mut StreamState, tx: &mpsc::Sender<StreamFrame>) -> bool {
        let batch = std::mem::take(&mut state.buffer);
        for event in batch {
            if !send_frame(tx, StreamFrame::Data(event), state).await {
                return false;
            }
            state.events_sent += 1;
        }
        state.last_flush = Instant::now();
        true
    }
}

/// Sends one frame, resetting the keepalive clock. Returns `false` if the
/// receiver was dropped.
async fn send_frame(
    tx: &mpsc::Sender<StreamFrame>,
    frame: StreamFrame,
    state: &mut StreamState,
) -> bool {
    if tx.send(frame).await.is_err() {
        debug!("Frame channel closed by client");
        return false;
    }
    state.last_keepalive = Instant::now();
    true
}

/// Widens the poll interval by the backoff factor, capped at the ceiling.
fn next_poll_interval(current: Duration, config: &StreamerConfig) -> Duration {
    let scaled = Duration::from_secs_f64(current.as_secs_f64() * config.poll_backoff_factor);
    scaled.min(config.max_poll_interval())
}
