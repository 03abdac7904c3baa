//! Runtime core: execution contexts and delivery.
//!
//! The public API from this module is [`Runtime`] (with [`RuntimeBuilder`]) and
//! [`Looper`]. The orchestration itself is sealed here; callers customize tasks
//! only through the capability slots of [`FluentTask`](crate::FluentTask).
//!
//! Internal modules:
//! - [`runner`]: background phase (perform → transform → completion);
//! - [`dispatch`]: looper-side delivery of progress and outcome;
//! - [`looper`]: the coordinating context;
//! - [`inflight`]: registry of running task drivers;
//! - [`runtime`]: wiring and shutdown.

mod builder;
mod dispatch;
mod inflight;
mod looper;
mod runner;
mod runtime;

pub(crate) use dispatch::Listeners;
pub(crate) use runner::Pipeline;

pub use builder::RuntimeBuilder;
pub use looper::Looper;
pub use runtime::Runtime;
