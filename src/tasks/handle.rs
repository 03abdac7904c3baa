//! # Handle to a started task.
//!
//! [`TaskHandle`] is returned by [`Runtime::execute`](crate::Runtime::execute). It
//! does not own the work: dropping it neither cancels nor detaches anything.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::state::{TaskRecord, TaskState};

/// Inspection and cancellation handle for one execution.
pub struct TaskHandle {
    record: Arc<TaskRecord>,
    token: CancellationToken,
    state: watch::Receiver<TaskState>,
    bus: Bus,
}

impl TaskHandle {
    pub(crate) fn new(
        record: Arc<TaskRecord>,
        token: CancellationToken,
        state: watch::Receiver<TaskState>,
        bus: Bus,
    ) -> Self {
        Self {
            record,
            token,
            state,
            bus,
        }
    }

    /// Runtime-assigned id (unique per runtime).
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Requests cancellation.
    ///
    /// Cooperative: a performer that already started runs to completion, but later
    /// phases are skipped and the outcome goes to the failure listener. Has no
    /// effect once the outcome has been delivered.
    pub fn cancel(&self) {
        if self.token.is_cancelled() || self.state().is_terminal() {
            return;
        }
        self.bus.publish(
            Event::new(EventKind::CancelRequested)
                .with_task(self.record.name.clone())
                .with_task_id(self.record.id),
        );
        self.token.cancel();
    }

    /// True once cancellation was requested or a failure was captured.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// The failure captured from the performer or transformer, if any.
    ///
    /// `None` after a success and after a plain cancellation.
    pub fn last_failure(&self) -> Option<&TaskError> {
        self.record.failure()
    }

    /// Waits until the outcome listener has run on the looper.
    ///
    /// Returns the terminal state, or [`RuntimeError::LooperClosed`] when the outcome
    /// can no longer be delivered.
    pub async fn join(&self) -> Result<TaskState, RuntimeError> {
        let mut rx = self.state.clone();
        let state = *rx
            .wait_for(|s| s.is_terminal())
            .await
            .map_err(|_| RuntimeError::LooperClosed)?;
        Ok(state)
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .field("state", &self.state())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
