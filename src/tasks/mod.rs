//! # Task abstractions.
//!
//! This module provides the task-facing types:
//! - [`FluentTask`] - builder collecting the capabilities of one unit of work
//! - [`Performer`], [`Transformer`], [`ProgressListener`], [`ResultListener`],
//!   [`CompletionListener`] - the capability traits
//! - [`TaskContext`] - progress publishing and cancellation inside a performer
//! - [`TaskHandle`], [`TaskState`] - inspecting a started task

mod context;
mod handle;
mod listener;
mod state;
mod task;

pub(crate) use context::ProgressSink;
pub(crate) use state::{StateTx, TaskRecord, advance};

pub use context::TaskContext;
pub use handle::TaskHandle;
pub use listener::{CompletionListener, Performer, ProgressListener, ResultListener, Transformer};
pub use state::TaskState;
pub use task::FluentTask;
