//! # Fluent task builder.
//!
//! [`FluentTask`] collects the capabilities of one unit of background work and is
//! consumed when started, so every instance executes at most once and cannot be
//! reconfigured while running.
//!
//! ## Phases
//! ```text
//! background:  performer(params) ──► transformer(intermediate) ──► completion(&result)
//!                  │ progress                                             │
//!                  ▼                                                      ▼
//! looper:      progress(v) ... progress(v) ───────────────────► success(result)
//!                                                                  or failure(Option<result>)
//! ```
//!
//! ## Example
//! ```rust
//! use fluentask::{Config, FluentTask, Runtime, TaskContext, TaskError, TaskState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::builder(Config::default()).build();
//!
//!     let handle = FluentTask::named("parse")
//!         .set_performer(|raw: String, _ctx: &TaskContext<()>| -> Result<String, TaskError> {
//!             Ok(raw.trim().to_string())
//!         })
//!         .set_transformer(|s: String| -> Result<u32, TaskError> {
//!             s.parse().map_err(|e| TaskError::with_source("not a number", e))
//!         })
//!         .set_success_listener(|n: u32| println!("parsed {n}"))
//!         .set_failure_listener(|_: Option<u32>| println!("parse failed"))
//!         .execute(&rt, " 42 ".to_string());
//!
//!     assert_eq!(handle.join().await?, TaskState::Succeeded);
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::core::{Listeners, Pipeline, Runtime};
use crate::tasks::handle::TaskHandle;
use crate::tasks::listener::{
    CompletionListener, Performer, ProgressListener, ResultListener, Transformer,
};

/// Single-use asynchronous unit of work configured through chained setters.
///
/// Type parameters:
/// - `P`: parameters handed to the performer
/// - `Pr`: progress values
/// - `I`: intermediate value produced by the performer
/// - `R`: final result (defaults to `I`, in which case no transformer is needed)
///
/// Every slot is optional; an empty slot is skipped at run time. A task started
/// without a performer fails with [`TaskError::MissingPerformer`](crate::TaskError::MissingPerformer).
pub struct FluentTask<P, Pr = (), I = (), R = I> {
    name: Cow<'static, str>,
    performer: Option<Box<dyn Performer<P, Pr, I>>>,
    transformer: Option<Box<dyn Transformer<I, R>>>,
    completion: Option<Box<dyn CompletionListener<R>>>,
    progress: Option<Box<dyn ProgressListener<Pr>>>,
    success: Option<Box<dyn ResultListener<R>>>,
    failure: Option<Box<dyn ResultListener<Option<R>>>>,
}

impl<P, Pr, I, R> FluentTask<P, Pr, I, R> {
    /// Creates an unconfigured task named `fluent-task`.
    pub fn new() -> Self {
        Self::named("fluent-task")
    }

    /// Creates an unconfigured task with a name used in runtime events.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            performer: None,
            transformer: None,
            completion: None,
            progress: None,
            success: None,
            failure: None,
        }
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the performer (background, produces the intermediate value).
    pub fn set_performer(mut self, performer: impl Performer<P, Pr, I>) -> Self {
        self.performer = Some(Box::new(performer));
        self
    }

    /// Sets the transformer (background, intermediate → result).
    ///
    /// Without one, the intermediate value is passed through unchanged, which only
    /// succeeds when `I` and `R` are the same type.
    pub fn set_transformer(mut self, transformer: impl Transformer<I, R>) -> Self {
        self.transformer = Some(Box::new(transformer));
        self
    }

    /// Sets the progress listener (looper).
    pub fn set_progress_listener(mut self, listener: impl ProgressListener<Pr>) -> Self {
        self.progress = Some(Box::new(listener));
        self
    }

    /// Sets the completion listener (background, after a successful transform).
    pub fn set_completion_listener(mut self, listener: impl CompletionListener<R>) -> Self {
        self.completion = Some(Box::new(listener));
        self
    }

    /// Sets the success listener (looper).
    pub fn set_success_listener(mut self, listener: impl ResultListener<R>) -> Self {
        self.success = Some(Box::new(listener));
        self
    }

    /// Sets the failure listener (looper).
    ///
    /// Receives `None` when the failure prevented a result, or `Some(result)` when the
    /// task was cancelled after the result had been produced.
    pub fn set_failure_listener(mut self, listener: impl ResultListener<Option<R>>) -> Self {
        self.failure = Some(Box::new(listener));
        self
    }

    /// Splits the builder into the background pipeline and the looper listeners.
    pub(crate) fn into_parts(self) -> (Cow<'static, str>, Pipeline<P, Pr, I, R>, Listeners<Pr, R>) {
        let pipeline = Pipeline {
            performer: self.performer,
            transformer: self.transformer,
            completion: self.completion,
        };
        let listeners = Listeners {
            progress: self.progress,
            success: self.success,
            failure: self.failure,
        };
        (self.name, pipeline, listeners)
    }
}

impl<P, Pr, I, R> FluentTask<P, Pr, I, R>
where
    P: Send + 'static,
    Pr: Send + 'static,
    I: Send + 'static,
    R: Send + 'static,
{
    /// Starts the task on `runtime` with `params`.
    ///
    /// Consumes the builder; see [`Runtime::execute`].
    pub fn execute(self, runtime: &Runtime, params: P) -> TaskHandle {
        runtime.execute(self, params)
    }
}

impl<P, Pr, I, R> Default for FluentTask<P, Pr, I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Pr, I, R> fmt::Debug for FluentTask<P, Pr, I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentTask")
            .field("name", &self.name)
            .field("performer", &self.performer.is_some())
            .field("transformer", &self.transformer.is_some())
            .field("completion", &self.completion.is_some())
            .field("progress", &self.progress.is_some())
            .field("success", &self.success.is_some())
            .field("failure", &self.failure.is_some())
            .finish()
    }
}
