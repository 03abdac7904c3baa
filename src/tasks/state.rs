//! # Execution state of a task.
//!
//! ```text
//! Pending ──► Performing ──► Transforming ──► Completing ──► Delivering ──► Succeeded
//!    │             │               │                              └──────► Cancelled
//!    └─────────────┴───────────────┴─ (failure / cancellation) ──► Delivering ──► Cancelled
//! ```
//!
//! Terminal states are absorbing and are only entered on the looper, after the
//! outcome listener returned.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::error::TaskError;

/// Where one execution currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Submitted, waiting for the background context (or a concurrency permit).
    Pending,
    /// Performer is running.
    Performing,
    /// Transformer (or the identity conversion) is running.
    Transforming,
    /// Completion listener is running.
    Completing,
    /// Outcome is queued on the looper.
    Delivering,
    /// Success listener was invoked.
    Succeeded,
    /// Failure listener was invoked (failure or explicit cancellation).
    Cancelled,
}

impl TaskState {
    /// True for [`TaskState::Succeeded`] and [`TaskState::Cancelled`].
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Cancelled)
    }

    /// True while the background phase is running.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            TaskState::Performing | TaskState::Transforming | TaskState::Completing
        )
    }
}

/// Write side of a task's state, shared by the runner and the dispatcher.
pub(crate) type StateTx = Arc<watch::Sender<TaskState>>;

/// Moves `tx` to `next` unless a terminal state was already reached.
pub(crate) fn advance(tx: &watch::Sender<TaskState>, next: TaskState) {
    tx.send_if_modified(|cur| {
        if cur.is_terminal() || *cur == next {
            return false;
        }
        *cur = next;
        true
    });
}

/// Identity and captured failure of one execution.
#[derive(Debug)]
pub(crate) struct TaskRecord {
    pub(crate) id: u64,
    pub(crate) name: Arc<str>,
    failure: OnceLock<TaskError>,
}

impl TaskRecord {
    pub(crate) fn new(id: u64, name: Arc<str>) -> Self {
        Self {
            id,
            name,
            failure: OnceLock::new(),
        }
    }

    /// Keeps the first failure; later ones are ignored.
    pub(crate) fn record_failure(&self, err: TaskError) {
        let _ = self.failure.set(err);
    }

    pub(crate) fn failure(&self) -> Option<&TaskError> {
        self.failure.get()
    }
}
