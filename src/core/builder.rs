use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{inflight::InFlight, looper::Looper, runtime::Runtime};
use crate::{
    config::Config,
    events::{Bus, Event},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Runtime`] with optional subscribers.
pub struct RuntimeBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RuntimeBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (task lifecycle, swallowed panics, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the runtime.
    ///
    /// Must be called from within a tokio runtime; spawns:
    /// - the looper task (coordinating context)
    /// - the event listener forwarding bus events to subscribers
    /// - one worker per subscriber
    pub fn build(self) -> Runtime {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());

        let listener_stop = CancellationToken::new();
        let listener_task = tokio::spawn(event_listener(bus.subscribe(), subs, listener_stop.clone()));

        let looper_stop = CancellationToken::new();
        let (looper, looper_loop) = Looper::channel(bus.clone(), looper_stop.clone());
        let looper_task = tokio::spawn(looper_loop.run());

        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(Semaphore::new)
            .map(Arc::new);

        Runtime {
            cfg: self.cfg,
            bus,
            looper,
            looper_stop,
            looper_task,
            listener_stop,
            listener_task,
            runtime_token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            semaphore,
            inflight: Arc::new(InFlight::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

/// Forwards bus events to the subscriber set until `stop` fires, then drains
/// what is already buffered and shuts the subscriber workers down.
async fn event_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            ev = rx.recv() => match ev {
                Ok(ev) => subs.emit(ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => subs.emit(ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    subs.shutdown().await;
}
