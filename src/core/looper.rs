//! # Looper: the coordinating context.
//!
//! A single-consumer FIFO queue of jobs drained by one tokio task. Every progress
//! delivery and every outcome delivery of every task runs here, one job at a time,
//! never on the background context.
//!
//! ```text
//! background runner ──post(progress)──┐
//! background runner ──post(outcome)───┼──► [unbounded FIFO] ──► LooperLoop::run ──► job()
//! caller            ──post(job)───────┘                              └─ panic → LooperJobPanicked
//! ```
//!
//! ## Rules
//! - Jobs from one producer run in the order they were posted.
//! - A panicking job is isolated; the loop keeps running.
//! - On stop, already queued jobs still run; new posts fail with
//!   [`RuntimeError::LooperClosed`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, panic_message};
use crate::events::{Bus, Event, EventKind};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle for posting work onto the coordinating context.
///
/// Cheap to clone; obtained from [`Runtime::looper`](crate::Runtime::looper).
#[derive(Clone, Debug)]
pub struct Looper {
    tx: mpsc::UnboundedSender<Job>,
}

impl Looper {
    /// Creates the handle and the loop that drains it.
    pub(crate) fn channel(bus: Bus, stop: CancellationToken) -> (Looper, LooperLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Looper { tx }, LooperLoop { rx, bus, stop })
    }

    /// Queues `job` to run on the looper.
    ///
    /// # Example
    /// ```
    /// use fluentask::{Config, Runtime};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> Result<(), fluentask::RuntimeError> {
    ///     let rt = Runtime::builder(Config::default()).build();
    ///     let (tx, rx) = tokio::sync::oneshot::channel();
    ///     rt.looper().post(move || { let _ = tx.send("on the looper"); })?;
    ///     assert_eq!(rx.await.ok(), Some("on the looper"));
    ///     rt.shutdown().await
    /// }
    /// ```
    pub fn post<F>(&self, job: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx
            .send(Box::new(job))
            .map_err(|_| RuntimeError::LooperClosed)
    }

    /// True once the loop stopped accepting jobs.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the looper queue.
pub(crate) struct LooperLoop {
    rx: mpsc::UnboundedReceiver<Job>,
    bus: Bus,
    stop: CancellationToken,
}

impl LooperLoop {
    /// Drains jobs until every handle is dropped or `stop` fires.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                job = self.rx.recv() => match job {
                    Some(job) => self.run_job(job),
                    None => break,
                },
                _ = self.stop.cancelled() => {
                    self.rx.close();
                    while let Some(job) = self.rx.recv().await {
                        self.run_job(job);
                    }
                    break;
                }
            }
        }
    }

    fn run_job(&self, job: Job) {
        if let Err(panic_err) = catch_unwind(AssertUnwindSafe(job)) {
            self.bus.publish(
                Event::new(EventKind::LooperJobPanicked).with_reason(panic_message(panic_err.as_ref())),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[tokio::test]
    async fn runs_jobs_in_order_and_survives_panics() {
        let bus = Bus::new(8);
        let mut events = bus.subscribe();
        let stop = CancellationToken::new();
        let (looper, lp) = Looper::channel(bus, stop.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            looper.post(move || seen.lock().unwrap().push(i)).unwrap();
        }
        looper.post(|| panic!("job exploded")).unwrap();
        let after = seen.clone();
        looper.post(move || after.lock().unwrap().push(99)).unwrap();

        stop.cancel();
        lp.run().await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 99]);
        assert!(looper.is_closed());
        assert!(matches!(looper.post(|| {}), Err(RuntimeError::LooperClosed)));

        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LooperJobPanicked);
        assert_eq!(ev.reason.as_deref(), Some("job exploded"));
    }
}
