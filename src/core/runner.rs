//! # Background phase of one execution.
//!
//! Runs on the blocking pool and never touches looper listeners directly.
//!
//! ## Flow
//! ```text
//! cancelled? ──yes──► Cancelled(None)
//!    │no
//! TaskStarting ─► performer(params) ──Err/panic──► record, cancel ─► Cancelled(None)
//!    │Ok(intermediate)
//! cancelled? ──yes──► Cancelled(None)
//!    │no
//! transformer(intermediate) | identity ──Err/panic──► record, cancel ─► Cancelled(None)
//!    │Ok(result)
//! cancelled? ──yes──► Cancelled(Some(result))
//!    │no
//! completion(&result)   (panic swallowed)
//!    │
//! cancelled? ──yes──► Cancelled(Some(result))
//!    │no
//! Succeeded(result)
//! ```
//!
//! ## Rules
//! - Every failure (returned or panicked) is recorded as the task's last failure
//!   and converted into cancellation of the task token.
//! - A performer returning [`TaskError::Canceled`] cancels without recording a failure.
//! - Cancellation observed between phases skips the remaining phases.

use std::any::{Any, type_name};
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::core::dispatch::{Outcome, guard_listener};
use crate::error::{TaskError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{
    CompletionListener, Performer, TaskContext, TaskRecord, TaskState, Transformer, advance,
};

/// Capabilities that run on the background context.
pub(crate) struct Pipeline<P, Pr, I, R> {
    pub(crate) performer: Option<Box<dyn Performer<P, Pr, I>>>,
    pub(crate) transformer: Option<Box<dyn Transformer<I, R>>>,
    pub(crate) completion: Option<Box<dyn CompletionListener<R>>>,
}

/// Runs perform → transform → completion and returns the outcome to deliver.
pub(crate) fn run_background<P, Pr, I, R>(
    pipeline: Pipeline<P, Pr, I, R>,
    params: P,
    ctx: &TaskContext<Pr>,
    record: &TaskRecord,
    state: &tokio::sync::watch::Sender<TaskState>,
    bus: &Bus,
) -> Outcome<R>
where
    P: 'static,
    Pr: 'static,
    I: 'static,
    R: 'static,
{
    let Pipeline {
        performer,
        transformer,
        completion,
    } = pipeline;

    if ctx.is_cancelled() {
        return Outcome::Cancelled(None);
    }

    advance(state, TaskState::Performing);
    bus.publish(
        Event::new(EventKind::TaskStarting)
            .with_task(record.name.clone())
            .with_task_id(record.id),
    );

    let performed = match performer {
        Some(mut performer) => guarded(|| performer.perform(params, ctx)),
        None => Err(TaskError::MissingPerformer),
    };
    let intermediate = match performed {
        Ok(v) => v,
        Err(e) => return fail(e, ctx, record, bus),
    };
    if ctx.is_cancelled() {
        return Outcome::Cancelled(None);
    }

    advance(state, TaskState::Transforming);
    let transformed = match transformer {
        Some(mut transformer) => guarded(|| transformer.transform(intermediate)),
        None => identity(intermediate),
    };
    let result = match transformed {
        Ok(v) => v,
        Err(e) => return fail(e, ctx, record, bus),
    };
    if ctx.is_cancelled() {
        return Outcome::Cancelled(Some(result));
    }

    if let Some(mut listener) = completion {
        advance(state, TaskState::Completing);
        guard_listener(bus, record, "completion", || listener.on_complete(&result));
    }
    if ctx.is_cancelled() {
        return Outcome::Cancelled(Some(result));
    }
    Outcome::Succeeded(result)
}

fn fail<Pr, R>(err: TaskError, ctx: &TaskContext<Pr>, record: &TaskRecord, bus: &Bus) -> Outcome<R> {
    if matches!(err, TaskError::Canceled) {
        ctx.cancellation_token().cancel();
        return Outcome::Cancelled(None);
    }
    bus.publish(
        Event::new(EventKind::TaskFailed)
            .with_task(record.name.clone())
            .with_task_id(record.id)
            .with_reason(err.to_string()),
    );
    record.record_failure(err);
    ctx.cancellation_token().cancel();
    Outcome::Cancelled(None)
}

/// Runs a performer/transformer call, turning a panic into [`TaskError::Panicked`].
fn guarded<T>(f: impl FnOnce() -> Result<T, TaskError>) -> Result<T, TaskError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(panic_err) => Err(TaskError::Panicked {
            message: panic_message(panic_err.as_ref()),
        }),
    }
}

/// Default transform: passes the value through when `I` and `R` are the same type.
fn identity<I: 'static, R: 'static>(value: I) -> Result<R, TaskError> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed
        .downcast::<R>()
        .map(|v| *v)
        .map_err(|_| TaskError::TypeMismatch {
            from: type_name::<I>(),
            to: type_name::<R>(),
        })
}
