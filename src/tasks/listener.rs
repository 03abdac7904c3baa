//! # Capabilities accepted by [`FluentTask`](crate::FluentTask).
//!
//! Each capability is a single-method trait with a blanket implementation for
//! closures of the matching shape, so a slot can be filled either with a closure
//! or with a reusable type:
//!
//! | Capability              | Runs on     | Closure shape                                   |
//! |-------------------------|-------------|-------------------------------------------------|
//! | [`Performer`]           | background  | `FnMut(P, &TaskContext<Pr>) -> Result<I, TaskError>` |
//! | [`Transformer`]         | background  | `FnMut(I) -> Result<R, TaskError>`              |
//! | [`CompletionListener`]  | background  | `FnMut(&R)`                                     |
//! | [`ProgressListener`]    | looper      | `FnMut(Pr)`                                     |
//! | [`ResultListener`]      | looper      | `FnMut(T)`                                      |
//!
//! Closures passed to the builder need annotated argument types.
//!
//! ## Example: reusable performer
//! ```
//! use fluentask::{Performer, TaskContext, TaskError};
//!
//! struct CountLines;
//!
//! impl Performer<String, usize, usize> for CountLines {
//!     fn perform(&mut self, text: String, ctx: &TaskContext<usize>) -> Result<usize, TaskError> {
//!         let mut n = 0;
//!         for _ in text.lines() {
//!             n += 1;
//!             ctx.publish_progress(n);
//!         }
//!         Ok(n)
//!     }
//! }
//! ```

use crate::error::TaskError;
use crate::tasks::context::TaskContext;

/// Produces the intermediate value from the task parameters.
///
/// Runs on the background context. Returning `Err` (or panicking) cancels the task
/// and routes the outcome to the failure listener.
pub trait Performer<P, Pr, I>: Send + 'static {
    /// Performs the work.
    fn perform(&mut self, params: P, ctx: &TaskContext<Pr>) -> Result<I, TaskError>;
}

impl<P, Pr, I, F> Performer<P, Pr, I> for F
where
    F: FnMut(P, &TaskContext<Pr>) -> Result<I, TaskError> + Send + 'static,
{
    fn perform(&mut self, params: P, ctx: &TaskContext<Pr>) -> Result<I, TaskError> {
        self(params, ctx)
    }
}

/// Maps the intermediate value to the final result.
///
/// Runs on the background context right after the performer.
pub trait Transformer<I, R>: Send + 'static {
    /// Transforms the intermediate value.
    fn transform(&mut self, intermediate: I) -> Result<R, TaskError>;
}

impl<I, R, F> Transformer<I, R> for F
where
    F: FnMut(I) -> Result<R, TaskError> + Send + 'static,
{
    fn transform(&mut self, intermediate: I) -> Result<R, TaskError> {
        self(intermediate)
    }
}

/// Receives progress values on the looper.
pub trait ProgressListener<Pr>: Send + 'static {
    /// Called once per published progress value, in publication order.
    fn update(&mut self, value: Pr);
}

impl<Pr, F> ProgressListener<Pr> for F
where
    F: FnMut(Pr) + Send + 'static,
{
    fn update(&mut self, value: Pr) {
        self(value)
    }
}

/// Receives a task outcome on the looper.
///
/// Used for the success slot (`T = R`) and the failure slot (`T = Option<R>`).
pub trait ResultListener<T>: Send + 'static {
    /// Handles the outcome value.
    fn handle(&mut self, result: T);
}

impl<T, F> ResultListener<T> for F
where
    F: FnMut(T) + Send + 'static,
{
    fn handle(&mut self, result: T) {
        self(result)
    }
}

/// Observes the final value on the background context, before hand-off to the looper.
///
/// Panics raised here are swallowed; they never turn a successful task into a failed one.
pub trait CompletionListener<R>: Send + 'static {
    /// Observes the produced value.
    fn on_complete(&mut self, result: &R);
}

impl<R, F> CompletionListener<R> for F
where
    F: FnMut(&R) + Send + 'static,
{
    fn on_complete(&mut self, result: &R) {
        self(result)
    }
}
