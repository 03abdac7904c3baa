//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [starting] task="load-users" id=3
//! [failed] task="load-users" id=3 err="not found"
//! [cancelled] task="load-users" id=3 reason="task_failed"
//! [listener-panicked] task="render" id=4 listener=success info="index out of bounds"
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn id(e: &Event) -> String {
    e.task_id.map(|i| i.to_string()).unwrap_or_else(|| "-".into())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::TaskStarting => {
                println!("[starting] task={task:?} id={}", id(e));
            }
            EventKind::TaskFailed => {
                println!("[failed] task={task:?} id={} err={reason:?}", id(e));
            }
            EventKind::TaskSucceeded => {
                println!("[succeeded] task={task:?} id={}", id(e));
            }
            EventKind::TaskCancelled => {
                println!("[cancelled] task={task:?} id={} reason={reason:?}", id(e));
            }
            EventKind::CancelRequested => {
                println!("[cancel-requested] task={task:?} id={}", id(e));
            }
            EventKind::ListenerPanicked => {
                println!(
                    "[listener-panicked] task={task:?} id={} listener={} info={reason:?}",
                    id(e),
                    e.listener.unwrap_or("unknown"),
                );
            }
            EventKind::LooperJobPanicked => {
                println!("[looper-job-panicked] info={reason:?}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={task} info={reason}");
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={task} reason={reason}");
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded] pending={reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
