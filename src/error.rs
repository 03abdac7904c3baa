//! Error types used by the fluentask runtime and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the runtime itself (looper, shutdown).
//! - [`TaskError`]: failures captured while a task performs or transforms its value.
//!
//! Both types provide `as_label` for logging/metrics.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the fluentask runtime.
///
/// These represent failures of the hosting machinery, never of a task's own work.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The coordinating looper stopped; outcomes can no longer be delivered.
    #[error("coordinating looper is closed")]
    LooperClosed,

    /// Shutdown grace period was exceeded; in-flight tasks were cancelled.
    #[error("shutdown timeout {grace:?} exceeded; pending: {pending:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks still running when the grace period ran out.
        pending: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fluentask::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::LooperClosed.as_label(), "runtime_looper_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::LooperClosed => "runtime_looper_closed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Failures of a single task execution.
///
/// Every variant ends up in the same place: it is recorded as the task's last
/// failure, the task is cancelled, and the failure listener receives the outcome.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Expected, deliberate failure ("no data found").
    #[error("{error}")]
    Fail {
        /// The failure message.
        error: String,
        /// Optional underlying cause.
        #[source]
        source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    },

    /// The performer or transformer panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// The panic payload rendered as text.
        message: String,
    },

    /// No transformer was configured and the intermediate value is not of the result type.
    #[error("cannot use {from} as {to} without a transformer")]
    TypeMismatch {
        /// Type name of the intermediate value.
        from: &'static str,
        /// Type name of the expected result.
        to: &'static str,
    },

    /// The task was started without a performer.
    #[error("no performer configured")]
    MissingPerformer,

    /// The performer stopped early after observing cancellation.
    ///
    /// Treated as a plain cancellation: it is not recorded as the task's last failure.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Creates an explicit failure signal with the given message.
    ///
    /// # Example
    /// ```
    /// use fluentask::TaskError;
    ///
    /// let err = TaskError::fail("not found");
    /// assert_eq!(err.to_string(), "not found");
    /// assert_eq!(err.message(), "not found");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
            source: None,
        }
    }

    /// Creates an explicit failure signal wrapping an underlying cause.
    pub fn with_source(
        error: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        TaskError::Fail {
            error: error.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the bare failure message.
    ///
    /// For [`TaskError::Fail`] this is the message given by the performer; other
    /// variants render their description.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            TaskError::Fail { error, .. } => Cow::Borrowed(error),
            TaskError::Panicked { message } => Cow::Borrowed(message),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fluentask::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::TypeMismatch { .. } => "task_type_mismatch",
            TaskError::MissingPerformer => "task_missing_performer",
            TaskError::Canceled => "task_canceled",
        }
    }

}

/// Renders a panic payload caught by `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
