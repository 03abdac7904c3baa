//! # Runtime: hosts the background and coordinating contexts.
//!
//! The [`Runtime`] owns the event bus, the [`Looper`], the subscriber fan-out and
//! the tracker of in-flight task drivers. It is the only way to start a
//! [`FluentTask`].
//!
//! ## High-level architecture
//! ```text
//! execute(task, params)
//!   ├─► TaskHandle (returned)
//!   └─► driver (tokio task, tracked)
//!         ├─► acquire permit (optional, cancellable)
//!         └─► spawn_blocking:
//!               runner::run_background ──progress──► Looper ──► progress listener
//!                       │
//!                       └──► Dispatcher::deliver ──► Looper ──► success | failure listener
//!
//! Event flow:
//!   runner / dispatcher / looper ── publish(Event) ──► Bus ──► event listener ──► SubscriberSet
//!
//! Shutdown path:
//!   publish(ShutdownRequested) ─► close tracker ─► wait(grace)
//!      ├─ Ok       → publish(AllStoppedWithin)
//!      └─ Timeout  → publish(GraceExceeded), cancel runtime token
//!   ─► stop looper (drains queued jobs) ─► stop event listener ─► stop subscribers
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Semaphore, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::core::builder::RuntimeBuilder;
use crate::core::dispatch::Dispatcher;
use crate::core::inflight::InFlight;
use crate::core::looper::Looper;
use crate::core::runner;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;
use crate::tasks::{FluentTask, ProgressSink, TaskContext, TaskHandle, TaskRecord, TaskState};

/// Hosts task execution: background pool, looper, events and shutdown.
pub struct Runtime {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) looper: Looper,
    pub(crate) looper_stop: CancellationToken,
    pub(crate) looper_task: JoinHandle<()>,
    pub(crate) listener_stop: CancellationToken,
    pub(crate) listener_task: JoinHandle<()>,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) tracker: TaskTracker,
    pub(crate) semaphore: Option<Arc<Semaphore>>,
    pub(crate) inflight: Arc<InFlight>,
    pub(crate) next_id: AtomicU64,
}

impl Runtime {
    /// Returns a builder for a runtime with the given configuration.
    pub fn builder(cfg: Config) -> RuntimeBuilder {
        RuntimeBuilder::new(cfg)
    }

    /// Creates a runtime with the given configuration and subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        RuntimeBuilder::new(cfg).with_subscribers(subscribers).build()
    }

    /// Starts `task` with `params` and returns its handle.
    ///
    /// The background phase runs on tokio's blocking pool; listeners run on the looper.
    /// Must be called from within the tokio runtime that built this `Runtime`.
    pub fn execute<P, Pr, I, R>(&self, task: FluentTask<P, Pr, I, R>, params: P) -> TaskHandle
    where
        P: Send + 'static,
        Pr: Send + 'static,
        I: Send + 'static,
        R: Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (name, pipeline, listeners) = task.into_parts();
        let record = Arc::new(TaskRecord::new(id, Arc::from(name.as_ref())));
        let token = self.runtime_token.child_token();
        let (state_tx, state_rx) = watch::channel(TaskState::Pending);
        let state_tx = Arc::new(state_tx);

        let dispatcher = Arc::new(Dispatcher::new(
            listeners,
            self.looper.clone(),
            Arc::clone(&record),
            Arc::clone(&state_tx),
            token.clone(),
            self.bus.clone(),
        ));
        let sink = dispatcher
            .reports_progress()
            .then(|| Arc::clone(&dispatcher) as Arc<dyn ProgressSink<Pr>>);
        let ctx = TaskContext::new(token.clone(), sink);

        let handle = TaskHandle::new(
            Arc::clone(&record),
            token.clone(),
            state_rx,
            self.bus.clone(),
        );

        let guard = self.inflight.enter(id, Arc::clone(&record.name));
        let semaphore = self.semaphore.clone();
        let bus = self.bus.clone();

        self.tracker.spawn(async move {
            let _guard = guard;
            let _permit = match semaphore {
                Some(sem) => tokio::select! {
                    res = sem.acquire_owned() => res.ok(),
                    _ = token.cancelled() => None,
                },
                None => None,
            };

            let _ = tokio::task::spawn_blocking(move || {
                let outcome = runner::run_background(pipeline, params, &ctx, &record, &state_tx, &bus);
                dispatcher.deliver(outcome);
            })
            .await;
        });

        handle
    }

    /// The coordinating context.
    pub fn looper(&self) -> &Looper {
        &self.looper
    }

    /// Subscribes directly to runtime events.
    ///
    /// Receivers only observe events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Number of tasks whose background phase or delivery has not finished yet.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Waits for in-flight tasks and stops the runtime.
    ///
    /// Tasks get [`Config::grace`] to finish; past that they are cancelled and
    /// [`RuntimeError::GraceExceeded`] names the ones still pending. Outcomes already
    /// queued on the looper are delivered before it stops.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.tracker.close();

        let grace = self.cfg.grace;
        let res = match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                let pending = self.inflight.snapshot();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded).with_reason(pending.join(",")),
                );
                self.runtime_token.cancel();
                Err(RuntimeError::GraceExceeded { grace, pending })
            }
        };

        self.looper_stop.cancel();
        let _ = self.looper_task.await;
        self.listener_stop.cancel();
        let _ = self.listener_task.await;
        res
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("cfg", &self.cfg)
            .field("in_flight", &self.inflight.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::TaskError;

    fn runtime(cfg: Config) -> Runtime {
        Runtime::builder(cfg).build()
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn success_explodes(_: u32) {
        panic!("listener exploded");
    }

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn identity_result_reaches_success_listener() {
        let rt = runtime(Config::default());
        let got = Arc::new(Mutex::new(None));
        let sink = got.clone();

        let handle = FluentTask::named("answer")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<String, TaskError> {
                Ok("42".to_string())
            })
            .set_success_listener(move |v: String| {
                *sink.lock().unwrap() = Some(v);
            })
            .execute(&rt, ());

        assert_eq!(handle.join().await.unwrap(), TaskState::Succeeded);
        assert_eq!(got.lock().unwrap().as_deref(), Some("42"));
        assert!(handle.last_failure().is_none());
        assert!(!handle.is_cancelled());
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn performer_failure_runs_failure_listener_only() {
        let rt = runtime(Config::default());
        let failure = Arc::new(Mutex::new(Vec::new()));
        let succeeded = Arc::new(Mutex::new(false));
        let (f, s) = (failure.clone(), succeeded.clone());

        let handle = FluentTask::named("lookup")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<String, TaskError> {
                Err(TaskError::fail("not found"))
            })
            .set_success_listener(move |_: String| {
                *s.lock().unwrap() = true;
            })
            .set_failure_listener(move |v: Option<String>| f.lock().unwrap().push(v))
            .execute(&rt, ());

        assert_eq!(handle.join().await.unwrap(), TaskState::Cancelled);
        assert_eq!(*failure.lock().unwrap(), vec![None]);
        assert!(!*succeeded.lock().unwrap());
        assert!(handle.is_cancelled());
        assert_eq!(handle.last_failure().unwrap().message(), "not found");
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn progress_is_delivered_in_order_before_outcome() {
        let rt = runtime(Config::default());
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (p, c, s) = (log.clone(), log.clone(), log.clone());

        let handle = FluentTask::named("steps")
            .set_performer(|_: (), ctx: &TaskContext<u32>| -> Result<String, TaskError> {
                for step in 1..=3 {
                    ctx.publish_progress(step);
                }
                Ok("done".to_string())
            })
            .set_progress_listener(move |step: u32| p.lock().unwrap().push(step.to_string()))
            .set_completion_listener(move |v: &String| c.lock().unwrap().push(format!("complete:{v}")))
            .set_success_listener(move |v: String| s.lock().unwrap().push(v))
            .execute(&rt, ());

        assert_eq!(handle.join().await.unwrap(), TaskState::Succeeded);
        let log = log.lock().unwrap().clone();
        let delivered: Vec<_> = log.iter().filter(|e| !e.starts_with("complete:")).cloned().collect();
        assert_eq!(delivered, vec!["1", "2", "3", "done"]);

        let complete = log.iter().position(|e| e == "complete:done").unwrap();
        let success = log.iter().position(|e| e == "done").unwrap();
        assert!(complete < success);
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn transformer_failure_discards_intermediate() {
        let rt = runtime(Config::default());
        let failure = Arc::new(Mutex::new(Vec::new()));
        let f = failure.clone();

        let handle = FluentTask::named("parse")
            .set_performer(|raw: String, _: &TaskContext<()>| -> Result<String, TaskError> { Ok(raw) })
            .set_transformer(|s: String| -> Result<u32, TaskError> {
                s.parse().map_err(|e| TaskError::with_source("not a number", e))
            })
            .set_failure_listener(move |v: Option<u32>| f.lock().unwrap().push(v))
            .execute(&rt, "forty-two".to_string());

        assert_eq!(handle.join().await.unwrap(), TaskState::Cancelled);
        assert_eq!(*failure.lock().unwrap(), vec![None]);
        assert_eq!(handle.last_failure().unwrap().message(), "not a number");
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn panicking_listener_does_not_stall_looper() {
        let rt = runtime(Config::default());
        let mut events = rt.events();

        let broken = FluentTask::named("broken")
            .set_performer(|n: u32, _: &TaskContext<()>| -> Result<u32, TaskError> { Ok(n) })
            .set_success_listener(success_explodes)
            .execute(&rt, 1);
        assert_eq!(broken.join().await.unwrap(), TaskState::Succeeded);

        let got = Arc::new(Mutex::new(None));
        let sink = got.clone();
        let healthy = FluentTask::named("healthy")
            .set_performer(|n: u32, _: &TaskContext<()>| -> Result<u32, TaskError> { Ok(n + 1) })
            .set_success_listener(move |v: u32| {
                *sink.lock().unwrap() = Some(v);
            })
            .execute(&rt, 1);
        assert_eq!(healthy.join().await.unwrap(), TaskState::Succeeded);
        assert_eq!(*got.lock().unwrap(), Some(2));

        let panicked = drain(&mut events)
            .into_iter()
            .find(|e| e.kind == EventKind::ListenerPanicked)
            .expect("listener panic event");
        assert_eq!(panicked.task.as_deref(), Some("broken"));
        assert_eq!(panicked.listener, Some("success"));
        assert_eq!(panicked.reason.as_deref(), Some("listener exploded"));
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn task_without_listeners_completes() {
        let rt = runtime(Config::default());
        let handle = FluentTask::<u64, (), u64>::new()
            .set_performer(|n: u64, _: &TaskContext<()>| -> Result<u64, TaskError> { Ok(n * n) })
            .execute(&rt, 9);

        assert_eq!(handle.name(), "fluent-task");
        assert_eq!(handle.join().await.unwrap(), TaskState::Succeeded);
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn missing_transformer_with_other_result_type_fails() {
        let rt = runtime(Config::default());
        let handle = FluentTask::<(), (), u32, String>::named("mismatch")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<u32, TaskError> { Ok(1) })
            .execute(&rt, ());

        assert_eq!(handle.join().await.unwrap(), TaskState::Cancelled);
        assert!(matches!(
            handle.last_failure(),
            Some(TaskError::TypeMismatch { from: "u32", .. })
        ));
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_before_start_skips_performer() {
        let rt = runtime(Config::serial());
        let (release, gate) = std::sync::mpsc::channel::<()>();

        let first = FluentTask::<(), (), ()>::named("first")
            .set_performer(move |_: (), _: &TaskContext<()>| -> Result<(), TaskError> {
                let _ = gate.recv();
                Ok(())
            })
            .execute(&rt, ());

        let ran = Arc::new(Mutex::new(false));
        let failure = Arc::new(Mutex::new(Vec::new()));
        let (r, f) = (ran.clone(), failure.clone());
        let second = FluentTask::named("second")
            .set_performer(move |_: (), _: &TaskContext<()>| -> Result<u8, TaskError> {
                *r.lock().unwrap() = true;
                Ok(1)
            })
            .set_failure_listener(move |v: Option<u8>| f.lock().unwrap().push(v))
            .execute(&rt, ());
        second.cancel();

        assert_eq!(second.join().await.unwrap(), TaskState::Cancelled);
        assert!(!*ran.lock().unwrap());
        assert_eq!(*failure.lock().unwrap(), vec![None]);
        assert!(second.last_failure().is_none());

        release.send(()).unwrap();
        assert_eq!(first.join().await.unwrap(), TaskState::Succeeded);
        rt.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_while_outcome_is_queued_routes_to_failure() {
        let rt = runtime(Config::default());
        let (release, gate) = std::sync::mpsc::channel::<()>();
        rt.looper()
            .post(move || {
                let _ = gate.recv();
            })
            .unwrap();

        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (s, f) = (log.clone(), log.clone());
        let handle = FluentTask::named("queued")
            .set_performer(|n: u32, _: &TaskContext<()>| -> Result<u32, TaskError> { Ok(n) })
            .set_success_listener(move |v: u32| s.lock().unwrap().push(format!("success {v}")))
            .set_failure_listener(move |v: Option<u32>| f.lock().unwrap().push(format!("failure {v:?}")))
            .execute(&rt, 1);

        for _ in 0..200 {
            if handle.state() == TaskState::Delivering {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handle.state(), TaskState::Delivering);
        handle.cancel();
        release.send(()).unwrap();

        assert_eq!(handle.join().await.unwrap(), TaskState::Cancelled);
        assert!(handle.is_cancelled());
        assert!(handle.last_failure().is_none());
        assert_eq!(*log.lock().unwrap(), vec!["failure Some(1)"]);
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_after_outcome_is_ignored() {
        let rt = runtime(Config::default());
        let handle = FluentTask::<(), (), ()>::named("done")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<(), TaskError> { Ok(()) })
            .execute(&rt, ());

        assert_eq!(handle.join().await.unwrap(), TaskState::Succeeded);
        handle.cancel();
        assert!(!handle.is_cancelled());
        assert_eq!(handle.state(), TaskState::Succeeded);
        rt.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_reports_pending_tasks_past_grace() {
        let cfg = Config {
            grace: Duration::from_millis(50),
            ..Config::default()
        };
        let rt = runtime(cfg);
        let mut events = rt.events();

        let handle = FluentTask::<(), (), ()>::named("slow")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<(), TaskError> {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .execute(&rt, ());
        assert_eq!(rt.in_flight(), 1);

        match rt.shutdown().await {
            Err(RuntimeError::GraceExceeded { pending, .. }) => assert_eq!(pending, vec!["slow"]),
            other => panic!("expected grace exceeded, got {other:?}"),
        }
        assert!(handle.is_cancelled());
        assert!(matches!(handle.join().await, Err(RuntimeError::LooperClosed)));

        let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert!(kinds.contains(&EventKind::GraceExceeded));
    }

    #[tokio::test]
    async fn subscribers_see_lifecycle_until_shutdown() {
        let recorder = Arc::new(Recorder::default());
        let rt = Runtime::builder(Config::default())
            .with_subscriber(recorder.clone())
            .build();

        let handle = FluentTask::<(), (), ()>::named("observed")
            .set_performer(|_: (), _: &TaskContext<()>| -> Result<(), TaskError> { Ok(()) })
            .execute(&rt, ());
        handle.join().await.unwrap();
        rt.shutdown().await.unwrap();

        let kinds = recorder.kinds.lock().unwrap().clone();
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskStarting,
                EventKind::TaskSucceeded,
                EventKind::ShutdownRequested,
                EventKind::AllStoppedWithin,
            ]
        );
    }
}
