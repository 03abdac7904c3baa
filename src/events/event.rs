//! # Runtime events emitted by the runtime, task runners and the looper.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Task events**: one execution's path (starting, failed, succeeded, cancelled)
//! - **Isolation events**: faults that were swallowed (listener or subscriber panics)
//! - **Shutdown events**: runtime teardown
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task name,
//! task id and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use fluentask::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("load-users")
//!     .with_task_id(7)
//!     .with_reason("not found");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("load-users"));
//! assert_eq!(ev.reason.as_deref(), Some("not found"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task events ===
    /// Background phase started performing.
    ///
    /// Sets:
    /// - `task`, `task_id`
    TaskStarting,

    /// Performer or transformer failed; the failure was captured and the task cancelled.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `reason`: failure message
    TaskFailed,

    /// Outcome delivered to the success listener.
    ///
    /// Sets:
    /// - `task`, `task_id`
    TaskSucceeded,

    /// Outcome delivered to the failure listener.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `reason`: captured failure label, if any
    TaskCancelled,

    /// Cancellation was requested through a [`TaskHandle`](crate::TaskHandle).
    ///
    /// Sets:
    /// - `task`, `task_id`
    CancelRequested,

    // === Isolation events ===
    /// A task listener panicked; the panic was swallowed.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `listener`: which slot (`progress`, `completion`, `success`, `failure`)
    /// - `reason`: panic message
    ListenerPanicked,

    /// A job posted directly on the looper panicked.
    ///
    /// Sets:
    /// - `reason`: panic message
    LooperJobPanicked,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown started.
    ShutdownRequested,

    /// All in-flight tasks finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; remaining tasks were cancelled.
    ///
    /// Sets:
    /// - `reason`: names of pending tasks
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Runtime-assigned task id, if applicable.
    pub task_id: Option<u64>,
    /// Listener slot involved, if applicable.
    pub listener: Option<&'static str>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            listener: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: u64) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches the listener slot name.
    #[inline]
    pub fn with_listener(mut self, listener: &'static str) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskStarting);
        let b = Event::new(EventKind::TaskSucceeded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn overflow_event_carries_subscriber() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.task.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}
