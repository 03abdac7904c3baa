//! # Context handed to a performer.
//!
//! [`TaskContext`] is the performer's only link back to the runtime: it publishes
//! progress towards the looper and exposes the task's cancellation state.
//!
//! ## Rules
//! - `publish_progress` never blocks; the value is queued on the looper.
//! - After cancellation new progress is dropped; values already queued are still delivered.
//! - Without a progress listener configured, publishing is a no-op.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Destination for progress values (implemented by the looper dispatcher).
pub(crate) trait ProgressSink<Pr>: Send + Sync {
    fn publish(&self, value: Pr);
}

/// Per-execution context passed to [`Performer::perform`](crate::Performer::perform).
pub struct TaskContext<Pr> {
    token: CancellationToken,
    sink: Option<Arc<dyn ProgressSink<Pr>>>,
}

impl<Pr> TaskContext<Pr> {
    pub(crate) fn new(token: CancellationToken, sink: Option<Arc<dyn ProgressSink<Pr>>>) -> Self {
        Self { token, sink }
    }

    /// Queues a progress value for the progress listener.
    pub fn publish_progress(&self, value: Pr) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.publish(value);
        }
    }

    /// True once the task was cancelled (explicitly or after a captured failure).
    ///
    /// Long-running performers should check this and return early.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The task's cancellation token, for waiting on cancellation from async code.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<Pr> Clone for TaskContext<Pr> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<Pr> std::fmt::Debug for TaskContext<Pr> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("cancelled", &self.token.is_cancelled())
            .field("reports_progress", &self.sink.is_some())
            .finish()
    }
}
