//! # Looper-side delivery of progress and outcome.
//!
//! The [`Dispatcher`] owns a task's looper listeners (progress, success, failure)
//! and turns background signals into looper jobs.
//!
//! ## Rules
//! - Progress and outcome are posted by the same background thread, so every
//!   progress job runs before the outcome job.
//! - Exactly one outcome listener runs; afterwards progress jobs are ignored.
//! - Cancellation is checked again when the outcome job runs: a success that was
//!   cancelled while queued goes to the failure listener with its value.
//! - If the looper is closed the outcome is lost and `TaskCancelled` is published
//!   with reason `runtime_looper_closed`; progress posted to a closed looper is
//!   dropped without an event of its own.
//! - A panicking listener is swallowed and reported as `ListenerPanicked`; the
//!   task still reaches its terminal state.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::core::looper::Looper;
use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{
    ProgressListener, ProgressSink, ResultListener, StateTx, TaskRecord, TaskState, advance,
};

/// Listener slots that run on the looper.
pub(crate) struct Listeners<Pr, R> {
    pub(crate) progress: Option<Box<dyn ProgressListener<Pr>>>,
    pub(crate) success: Option<Box<dyn ResultListener<R>>>,
    pub(crate) failure: Option<Box<dyn ResultListener<Option<R>>>>,
}

/// Result of the background phase.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome<R> {
    Succeeded(R),
    Cancelled(Option<R>),
}

struct Slots<Pr, R> {
    listeners: Listeners<Pr, R>,
    delivered: bool,
}

/// Posts progress and the final outcome of one task to the looper.
pub(crate) struct Dispatcher<Pr, R> {
    slots: Arc<Mutex<Slots<Pr, R>>>,
    reports_progress: bool,
    looper: Looper,
    record: Arc<TaskRecord>,
    state: StateTx,
    token: CancellationToken,
    bus: Bus,
}

impl<Pr, R> Dispatcher<Pr, R>
where
    Pr: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        listeners: Listeners<Pr, R>,
        looper: Looper,
        record: Arc<TaskRecord>,
        state: StateTx,
        token: CancellationToken,
        bus: Bus,
    ) -> Self {
        Self {
            reports_progress: listeners.progress.is_some(),
            slots: Arc::new(Mutex::new(Slots {
                listeners,
                delivered: false,
            })),
            looper,
            record,
            state,
            token,
            bus,
        }
    }

    /// True when a progress listener is configured.
    pub(crate) fn reports_progress(&self) -> bool {
        self.reports_progress
    }

    /// Queues the outcome; the matching listener runs on the looper.
    ///
    /// If the looper is closed the outcome is dropped and waiting handles observe
    /// [`RuntimeError::LooperClosed`](crate::RuntimeError::LooperClosed).
    pub(crate) fn deliver(&self, outcome: Outcome<R>) {
        advance(&self.state, TaskState::Delivering);

        let slots = Arc::clone(&self.slots);
        let record = Arc::clone(&self.record);
        let state = Arc::clone(&self.state);
        let token = self.token.clone();
        let bus = self.bus.clone();

        let posted = self.looper.post(move || {
            let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.delivered {
                return;
            }
            slots.delivered = true;

            let outcome = match outcome {
                Outcome::Succeeded(value) if token.is_cancelled() => Outcome::Cancelled(Some(value)),
                other => other,
            };
            let terminal = match outcome {
                Outcome::Succeeded(value) => {
                    if let Some(listener) = slots.listeners.success.as_mut() {
                        guard_listener(&bus, &record, "success", || listener.handle(value));
                    }
                    TaskState::Succeeded
                }
                Outcome::Cancelled(value) => {
                    if let Some(listener) = slots.listeners.failure.as_mut() {
                        guard_listener(&bus, &record, "failure", || listener.handle(value));
                    }
                    TaskState::Cancelled
                }
            };
            slots.listeners.progress = None;
            drop(slots);

            publish_outcome(&bus, &record, terminal);
            advance(&state, terminal);
        });

        if let Err(err) = posted {
            self.bus.publish(
                Event::new(EventKind::TaskCancelled)
                    .with_task(self.record.name.clone())
                    .with_task_id(self.record.id)
                    .with_reason(err.as_label()),
            );
        }
    }
}

impl<Pr, R> ProgressSink<Pr> for Dispatcher<Pr, R>
where
    Pr: Send + 'static,
    R: Send + 'static,
{
    fn publish(&self, value: Pr) {
        if !self.reports_progress {
            return;
        }
        let slots = Arc::clone(&self.slots);
        let record = Arc::clone(&self.record);
        let bus = self.bus.clone();

        let _ = self.looper.post(move || {
            let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.delivered {
                return;
            }
            if let Some(listener) = slots.listeners.progress.as_mut() {
                guard_listener(&bus, &record, "progress", || listener.update(value));
            }
        });
    }
}

fn publish_outcome(bus: &Bus, record: &TaskRecord, terminal: TaskState) {
    let ev = match terminal {
        TaskState::Succeeded => Event::new(EventKind::TaskSucceeded),
        _ => {
            let ev = Event::new(EventKind::TaskCancelled);
            match record.failure() {
                Some(err) => ev.with_reason(err.as_label()),
                None => ev.with_reason("cancelled"),
            }
        }
    };
    bus.publish(ev.with_task(record.name.clone()).with_task_id(record.id));
}

/// Runs a listener, swallowing its panic.
pub(crate) fn guard_listener(
    bus: &Bus,
    record: &TaskRecord,
    slot: &'static str,
    f: impl FnOnce(),
) {
    if let Err(panic_err) = catch_unwind(AssertUnwindSafe(f)) {
        bus.publish(
            Event::new(EventKind::ListenerPanicked)
                .with_task(record.name.clone())
                .with_task_id(record.id)
                .with_listener(slot)
                .with_reason(panic_message(panic_err.as_ref())),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::{broadcast, watch};

    use super::*;
    use crate::core::looper::LooperLoop;
    use crate::tasks::TaskContext;

    struct Harness {
        dispatcher: Arc<Dispatcher<u32, u32>>,
        looper_loop: LooperLoop,
        stop: CancellationToken,
        token: CancellationToken,
        state: watch::Receiver<TaskState>,
        events: broadcast::Receiver<Event>,
    }

    impl Harness {
        fn new(listeners: Listeners<u32, u32>) -> Self {
            let bus = Bus::new(32);
            let events = bus.subscribe();
            let stop = CancellationToken::new();
            let (looper, looper_loop) = Looper::channel(bus.clone(), stop.clone());
            let (tx, state) = watch::channel(TaskState::Pending);
            let token = CancellationToken::new();
            let dispatcher = Arc::new(Dispatcher::new(
                listeners,
                looper,
                Arc::new(TaskRecord::new(1, Arc::from("dispatch-test"))),
                Arc::new(tx),
                token.clone(),
                bus,
            ));
            Self {
                dispatcher,
                looper_loop,
                stop,
                token,
                state,
                events,
            }
        }

        /// Runs every queued looper job, then stops the loop.
        async fn drain(self) -> (TaskState, Vec<Event>) {
            let Harness {
                looper_loop,
                stop,
                state,
                mut events,
                ..
            } = self;
            stop.cancel();
            looper_loop.run().await;
            let seen = std::iter::from_fn(|| events.try_recv().ok()).collect();
            let last = *state.borrow();
            (last, seen)
        }
    }

    fn failure_explodes(_: Option<u32>) {
        panic!("failure listener exploded");
    }

    fn listeners() -> Listeners<u32, u32> {
        Listeners {
            progress: None,
            success: None,
            failure: None,
        }
    }

    fn panicked_slots(events: &[Event]) -> Vec<&'static str> {
        events
            .iter()
            .filter(|e| e.kind == EventKind::ListenerPanicked)
            .filter_map(|e| e.listener)
            .collect()
    }

    #[tokio::test]
    async fn progress_after_outcome_is_dropped() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (p, s) = (log.clone(), log.clone());
        let mut l = listeners();
        l.progress = Some(Box::new(move |v: u32| p.lock().unwrap().push(format!("progress {v}"))));
        l.success = Some(Box::new(move |v: u32| s.lock().unwrap().push(format!("success {v}"))));
        let h = Harness::new(l);

        let sink = Arc::clone(&h.dispatcher) as Arc<dyn ProgressSink<u32>>;
        let ctx = TaskContext::new(h.token.clone(), Some(sink));
        let late = ctx.clone();

        ctx.publish_progress(1);
        h.dispatcher.deliver(Outcome::Succeeded(9));
        late.publish_progress(2);

        let (state, _) = h.drain().await;
        assert_eq!(state, TaskState::Succeeded);
        assert_eq!(*log.lock().unwrap(), vec!["progress 1", "success 9"]);
    }

    #[tokio::test]
    async fn panicking_failure_listener_still_terminates() {
        let mut l = listeners();
        l.failure = Some(Box::new(failure_explodes));
        let h = Harness::new(l);

        h.dispatcher.deliver(Outcome::Cancelled(None));

        let (state, events) = h.drain().await;
        assert_eq!(state, TaskState::Cancelled);
        assert_eq!(panicked_slots(&events), vec!["failure"]);
        assert!(events.iter().any(|e| e.kind == EventKind::TaskCancelled));
    }

    #[tokio::test]
    async fn panicking_progress_listener_keeps_later_deliveries() {
        let log = Arc::new(Mutex::new(Vec::<String>::new()));
        let (p, s) = (log.clone(), log.clone());
        let mut l = listeners();
        l.progress = Some(Box::new(move |v: u32| {
            if v == 2 {
                panic!("progress listener exploded");
            }
            p.lock().unwrap().push(format!("progress {v}"));
        }));
        l.success = Some(Box::new(move |v: u32| s.lock().unwrap().push(format!("success {v}"))));
        let h = Harness::new(l);

        for v in 1..=3 {
            h.dispatcher.publish(v);
        }
        h.dispatcher.deliver(Outcome::Succeeded(3));

        let (state, events) = h.drain().await;
        assert_eq!(state, TaskState::Succeeded);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["progress 1", "progress 3", "success 3"]
        );
        assert_eq!(panicked_slots(&events), vec!["progress"]);
    }

    #[tokio::test]
    async fn success_cancelled_while_queued_goes_to_failure() {
        let failure = Arc::new(Mutex::new(Vec::new()));
        let succeeded = Arc::new(Mutex::new(false));
        let (f, s) = (failure.clone(), succeeded.clone());
        let mut l = listeners();
        l.success = Some(Box::new(move |_: u32| {
            *s.lock().unwrap() = true;
        }));
        l.failure = Some(Box::new(move |v: Option<u32>| f.lock().unwrap().push(v)));
        let h = Harness::new(l);

        h.dispatcher.deliver(Outcome::Succeeded(7));
        h.token.cancel();

        let (state, _) = h.drain().await;
        assert_eq!(state, TaskState::Cancelled);
        assert_eq!(*failure.lock().unwrap(), vec![Some(7)]);
        assert!(!*succeeded.lock().unwrap());
    }

    #[tokio::test]
    async fn closed_looper_reports_lost_outcome() {
        let h = Harness::new(listeners());
        let Harness {
            dispatcher,
            looper_loop,
            state,
            mut events,
            ..
        } = h;
        drop(looper_loop);

        dispatcher.deliver(Outcome::Succeeded(1));

        assert_eq!(*state.borrow(), TaskState::Delivering);
        let ev = events.try_recv().expect("lost outcome event");
        assert_eq!(ev.kind, EventKind::TaskCancelled);
        assert_eq!(ev.task_id, Some(1));
        assert_eq!(ev.reason.as_deref(), Some("runtime_looper_closed"));
    }
}
