//! # fluentask
//!
//! **fluentask** runs one-shot units of background work configured through a
//! fluent builder.
//!
//! A [`FluentTask`] is assembled from optional capabilities: a performer that does
//! the work, a transformer that turns the intermediate value into the final result,
//! and listeners for progress, completion, success and failure. Started on a
//! [`Runtime`], the work runs on a background context while progress and outcome
//! listeners run one at a time on a single coordinating context, the [`Looper`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  FluentTask  │   │  FluentTask  │   │  FluentTask  │
//!     │   (#1, P1)   │   │   (#2, P2)   │   │   (#3, P3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼ execute          ▼ execute          ▼ execute
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runtime                                                          │
//! │  - Bus (broadcast events)                                         │
//! │  - Looper (coordinating context, single consumer)                 │
//! │  - TaskTracker + in-flight registry (shutdown with grace)         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ blocking pool│   │ blocking pool│   │ blocking pool│
//!     │ perform      │   │ perform      │   │ perform      │
//!     │ transform    │   │ transform    │   │ transform    │
//!     │ completion   │   │ completion   │   │ completion   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ progress/outcome │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                Looper (FIFO of jobs, one at a time)               │
//! │   progress listener ... progress listener ─► success | failure    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Pending ─► Performing ─► Transforming ─► [Completing] ─► Delivering ─► Succeeded
//!    │            │               │               │              └─────► Cancelled
//!    └────────────┴───────────────┴───────────────┴─ cancel / failure ─► Cancelled
//! ```
//! A failure in the performer or transformer (returned error or panic) is recorded
//! as the task's last failure and converted into cancellation; the failure listener
//! then runs on the looper.
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                         |
//! |-------------------|------------------------------------------------------------------|--------------------------------------------|
//! | **Tasks**         | Fluent builder of capabilities, single use.                      | [`FluentTask`], [`Performer`], [`Transformer`] |
//! | **Listeners**     | Progress, completion, success and failure callbacks.             | [`ProgressListener`], [`CompletionListener`], [`ResultListener`] |
//! | **Control**       | Cancel, observe state, wait for the outcome.                     | [`TaskHandle`], [`TaskState`], [`TaskContext`] |
//! | **Runtime**       | Background and coordinating contexts, graceful shutdown.         | [`Runtime`], [`Looper`], [`Config`]        |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom subscribers). | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Typed errors for task execution and the runtime.                 | [`TaskError`], [`RuntimeError`]            |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use fluentask::{Config, FluentTask, Runtime, TaskContext, TaskError, TaskState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn fluentask::Subscribe>> = {
//!         use fluentask::LogWriter;
//!         vec![Arc::new(LogWriter::default())]
//!     };
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn fluentask::Subscribe>> = Vec::new();
//!
//!     let rt = Runtime::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let handle = FluentTask::named("answer")
//!         .set_performer(|_: (), ctx: &TaskContext<u8>| -> Result<String, TaskError> {
//!             for step in 1..=3 {
//!                 ctx.publish_progress(step);
//!             }
//!             Ok("42".to_string())
//!         })
//!         .set_progress_listener(|step: u8| println!("step {step}"))
//!         .set_success_listener(|answer: String| println!("answer = {answer}"))
//!         .execute(&rt, ());
//!
//!     assert_eq!(handle.join().await?, TaskState::Succeeded);
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Looper, Runtime, RuntimeBuilder};
pub use error::{RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    CompletionListener, FluentTask, Performer, ProgressListener, ResultListener, TaskContext,
    TaskHandle, TaskState, Transformer,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
