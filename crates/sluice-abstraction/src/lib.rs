//! Event source abstraction layer for Sluice.
//!
//! This crate defines the contract between the streaming core and whatever
//! backend persists task execution events: the [`TaskEvent`] data model, the
//! pull-style [`EventSource`] trait, and a [`MemoryEventSource`] reference
//! implementation used by tests and in-process deployments.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Represents an error that can occur when fetching events from a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSourceError {
    /// The backing store failed (e.g. connection loss, query failure).
    #[error("Backend error: {0}")]
    Backend(String),

    /// The requested task does not exist in the store.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// An event row could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A single structured execution event emitted by the agent pipeline.
///
/// Field order matches the wire JSON key order. `seq` is strictly increasing
/// per `task_id` and is the sole ordering and resumption key; events are
/// immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Sequence number within the task (strictly increasing).
    pub seq: u64,
    /// Unique event identifier.
    pub event_id: String,
    /// Task this event belongs to.
    pub task_id: String,
    /// Event type (e.g. "phase.started", "span.completed").
    pub event_type: String,
    /// Execution phase, if the event is phase-scoped.
    pub phase: Option<String>,
    /// Actor that produced the event (agent id, tool name, ...).
    pub actor: String,
    /// Span this event belongs to.
    pub span_id: String,
    /// Parent span, if nested.
    pub parent_span_id: Option<String>,
    /// Structured event payload.
    pub payload: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskEvent {
    /// Creates a new event with a fresh id and the current timestamp.
    ///
    /// # Arguments
    /// * `task_id` - Task the event belongs to
    /// * `seq` - Sequence number within the task
    /// * `event_type` - Event type string
    /// * `actor` - Actor that produced the event
    /// * `span_id` - Span the event belongs to
    /// * `payload` - Structured payload
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        seq: u64,
        event_type: impl Into<String>,
        actor: impl Into<String>,
        span_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            seq,
            event_id: Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            event_type: event_type.into(),
            phase: None,
            actor: actor.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Sets the execution phase.
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// Sets the parent span.
    #[must_use]
    pub fn with_parent_span(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }
}

/// Pull-style source of task events.
///
/// Implementations must return events ordered ascending by `seq`, containing
/// only events with `seq > since_seq`, at most `limit` of them, and must
/// tolerate high-frequency polling from many independent readers.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches up to `limit` events for `task_id` with `seq > since_seq`.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be queried.
    async fn events_after(
        &self,
        task_id: &str,
        since_seq: u64,
        limit: usize,
    ) -> Result<Vec<TaskEvent>, EventSourceError>;
}

/// In-memory event source for tests and in-process pipelines.
///
/// Events are kept per task, sorted by `seq`. Appending is synchronous;
/// reads go through the [`EventSource`] trait like any other backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: Arc<RwLock<HashMap<String, Vec<TaskEvent>>>>,
}

impl MemoryEventSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single event to its task's log.
    pub fn append(&self, event: TaskEvent) {
        let mut events = self.events.write().expect("event map lock poisoned");
        let log = events.entry(event.task_id.clone()).or_default();
        log.push(event);
        log.sort_by_key(|e| e.seq);
    }

    /// Appends a batch of events.
    pub fn append_all(&self, batch: impl IntoIterator<Item = TaskEvent>) {
        for event in batch {
            self.append(event);
        }
    }

    /// Returns the number of stored events for a task.
    #[must_use]
    pub fn len(&self, task_id: &str) -> usize {
        self.events
            .read()
            .expect("event map lock poisoned")
            .get(task_id)
            .map_or(0, Vec::len)
    }

    /// Returns true if no events are stored for a task.
    #[must_use]
    pub fn is_empty(&self, task_id: &str) -> bool {
        self.len(task_id) == 0
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn events_after(
        &self,
        task_id: &str,
        since_seq: u64,
        limit: usize,
    ) -> Result<Vec<TaskEvent>, EventSourceError> {
        let events = self.events.read().expect("event map lock poisoned");
        let page = events
            .get(task_id)
            .map(|log| {
                log.iter()
                    .filter(|e| e.seq > since_seq)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }
}
