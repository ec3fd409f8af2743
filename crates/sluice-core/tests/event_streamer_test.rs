//! Tests for the poll-to-push event streamer: catch-up, resumption, pacing,
//! keepalives, the lifetime cap, and failure semantics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use sluice_abstraction::{EventSource, EventSourceError, MemoryEventSource, TaskEvent};
use sluice_core::stream::{EventStreamer, RECONNECT_EVENT_LIMIT, StreamFrame};
use sluice_core::{StreamStats, StreamerConfig};
use tokio::sync::mpsc;

const TASK: &str = "task-1";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sluice_core=debug")
        .with_test_writer()
        .try_init();
}

fn event(seq: u64) -> TaskEvent {
    TaskEvent::new(TASK, seq, "span.progress", "agent-1", "span-1", json!({"n": seq}))
}

fn source_with(n: u64) -> Arc<MemoryEventSource> {
    let source = Arc::new(MemoryEventSource::new());
    source.append_all((1..=n).map(event));
    source
}

fn spawn_streamer(
    source: Arc<MemoryEventSource>,
    config: StreamerConfig,
    since_seq: u64,
) -> (mpsc::Receiver<StreamFrame>, tokio::task::JoinHandle<StreamStats>) {
    let (tx, rx) = mpsc::channel(4096);
    let handle = tokio::spawn(async move {
        EventStreamer::new(source, TASK, config).run(since_seq, tx).await
    });
    (rx, handle)
}

async fn recv_data_seqs(rx: &mut mpsc::Receiver<StreamFrame>, count: usize) -> Vec<u64> {
    let mut seqs = Vec::with_capacity(count);
    while seqs.len() < count {
        match rx.recv().await.expect("stream ended early") {
            StreamFrame::Data(e) => seqs.push(e.seq),
            StreamFrame::Keepalive => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
    seqs
}

#[tokio::test(start_paused = true)]
async fn test_catchup_emits_full_history_in_order() {
    init_tracing();
    let (mut rx, handle) = spawn_streamer(source_with(250), StreamerConfig::default(), 0);

    let seqs = recv_data_seqs(&mut rx, 250).await;
    assert_eq!(seqs, (1..=250).collect::<Vec<_>>());

    drop(rx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.events_sent, 250);
    assert_eq!(stats.last_seq, 250);
}

#[tokio::test(start_paused = true)]
async fn test_resume_from_cursor_has_no_gaps_or_duplicates() {
    let (mut rx, handle) = spawn_streamer(source_with(250), StreamerConfig::default(), 100);

    let seqs = recv_data_seqs(&mut rx, 150).await;
    assert_eq!(seqs, (101..=250).collect::<Vec<_>>());

    drop(rx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.events_sent, 150);
}

#[tokio::test(start_paused = true)]
async fn test_tail_delivers_events_appended_after_start() {
    let source = Arc::new(MemoryEventSource::new());
    let (mut rx, handle) = spawn_streamer(source.clone(), StreamerConfig::default(), 0);

    // Let the streamer finish (empty) catch-up and enter the tail.
    tokio::task::yield_now().await;
    source.append_all((1..=3).map(event));

    // Three events stay under the batch size, so the interval flush delivers them.
    let seqs = recv_data_seqs(&mut rx, 3).await;
    assert_eq!(seqs, vec![1, 2, 3]);

    drop(rx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_full_batch_flushes_without_waiting_for_interval() {
    let source = Arc::new(MemoryEventSource::new());
    let config = StreamerConfig { flush_interval_ms: 60_000, ..StreamerConfig::default() };
    let batch_size = config.batch_size as u64;
    let (mut rx, handle) = spawn_streamer(source.clone(), config, 0);

    tokio::task::yield_now().await;
    source.append_all((1..=batch_size).map(event));

    // A full batch must not wait for the (deliberately huge) flush interval.
    let started = tokio::time::Instant::now();
    let seqs = recv_data_seqs(&mut rx, batch_size as usize).await;
    assert_eq!(seqs.len(), batch_size as usize);
    assert!(started.elapsed() < Duration::from_secs(60));

    drop(rx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_after_idle_interval() {
    let source = Arc::new(MemoryEventSource::new());
    let (mut rx, handle) = spawn_streamer(source, StreamerConfig::default(), 0);

    let started = tokio::time::Instant::now();
    let frame = rx.recv().await.unwrap();
    assert_eq!(frame, StreamFrame::Keepalive);
    // Nothing else was emitted before the keepalive interval elapsed.
    assert!(started.elapsed() >= Duration::from_secs(30));

    drop(rx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_event_limit_emits_one_reconnect_then_ends() {
    let source = source_with(5);
    let config = StreamerConfig { max_events_per_stream: 5, ..StreamerConfig::default() };
    let (mut rx, handle) = spawn_streamer(source, config, 0);

    let seqs = recv_data_seqs(&mut rx, 5).await;
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);

    match rx.recv().await.unwrap() {
        StreamFrame::Reconnect { last_seq, reason } => {
            assert_eq!(last_seq, 5);
            assert_eq!(reason, RECONNECT_EVENT_LIMIT);
        }
        other => panic!("expected reconnect frame, got {other:?}"),
    }
    // Stream terminates after the control frame.
    assert!(rx.recv().await.is_none());

    let stats = handle.await.unwrap();
    assert_eq!(stats.events_sent, 5);
    assert_eq!(stats.last_seq, 5);
}

/// Event source that always fails.
struct FailingSource;

#[async_trait]
impl EventSource for FailingSource {
    async fn events_after(
        &self,
        _task_id: &str,
        _since_seq: u64,
        _limit: usize,
    ) -> Result<Vec<TaskEvent>, EventSourceError> {
        Err(EventSourceError::Backend("store unavailable".to_string()))
    }
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_surfaces_one_error_frame() {
    let (tx, mut rx) = mpsc::channel(16);
    let streamer = EventStreamer::new(Arc::new(FailingSource), TASK, StreamerConfig::default());
    let handle = tokio::spawn(async move { streamer.run(0, tx).await });

    match rx.recv().await.unwrap() {
        StreamFrame::Error { last_seq, error } => {
            assert_eq!(last_seq, 0);
            assert!(error.contains("store unavailable"));
        }
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());
    handle.await.unwrap();
}

/// Event source that serves stored history, then fails once tailing starts.
struct FailsAfterCatchup {
    inner: MemoryEventSource,
}

#[async_trait]
impl EventSource for FailsAfterCatchup {
    async fn events_after(
        &self,
        task_id: &str,
        since_seq: u64,
        limit: usize,
    ) -> Result<Vec<TaskEvent>, EventSourceError> {
        let page = self.inner.events_after(task_id, since_seq, limit).await?;
        if page.is_empty() {
            return Err(EventSourceError::Backend("poll failed".to_string()));
        }
        Ok(page)
    }
}

#[tokio::test(start_paused = true)]
async fn test_mid_stream_failure_carries_last_delivered_seq() {
    let inner = MemoryEventSource::new();
    inner.append_all((1..=3).map(event));
    let (tx, mut rx) = mpsc::channel(16);
    let streamer = EventStreamer::new(
        Arc::new(FailsAfterCatchup { inner }),
        TASK,
        StreamerConfig::default(),
    );
    let handle = tokio::spawn(async move { streamer.run(0, tx).await });

    let seqs = recv_data_seqs(&mut rx, 3).await;
    assert_eq!(seqs, vec![1, 2, 3]);

    match rx.recv().await.unwrap() {
        StreamFrame::Error { last_seq, .. } => assert_eq!(last_seq, 3),
        other => panic!("expected error frame, got {other:?}"),
    }
    assert!(rx.recv().await.is_none());

    let stats = handle.await.unwrap();
    assert_eq!(stats.last_seq, 3);
}

#[tokio::test(start_paused = true)]
async fn test_client_disconnect_ends_stream_without_error_frame() {
    let source = Arc::new(MemoryEventSource::new());
    let (rx, handle) = spawn_streamer(source, StreamerConfig::default(), 0);

    // Client goes away while the streamer idles in the tail.
    drop(rx);
    let stats = handle.await.unwrap();
    assert_eq!(stats.events_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_independent_streamers_share_nothing() {
    let source = source_with(10);
    let (mut rx_a, handle_a) = spawn_streamer(source.clone(), StreamerConfig::default(), 0);
    let (mut rx_b, handle_b) = spawn_streamer(source, StreamerConfig::default(), 5);

    let seqs_a = recv_data_seqs(&mut rx_a, 10).await;
    let seqs_b = recv_data_seqs(&mut rx_b, 5).await;
    assert_eq!(seqs_a, (1..=10).collect::<Vec<_>>());
    assert_eq!(seqs_b, (6..=10).collect::<Vec<_>>());

    drop(rx_a);
    drop(rx_b);
    handle_a.await.unwrap();
    handle_b.await.unwrap();
}
