//! # Example: basic_one_shot
//!
//! Minimal example of a single task without subscribers.
//!
//! Demonstrates how to:
//! - Configure a [`FluentTask`] with a performer and a success listener.
//! - Start it on a [`Runtime`] and wait for its outcome.
//! - Shut the runtime down cleanly.
//!
//! ## Flow
//! ```text
//! FluentTask ──► Runtime::execute()
//!     ├─► blocking pool
//!     │     ├─► publish(TaskStarting)
//!     │     └─► performer("42") ─► identity transform
//!     ├─► Looper
//!     │     ├─► success listener("42")
//!     │     └─► publish(TaskSucceeded)
//!     └─► Runtime::shutdown()
//!          ├─► publish(AllStoppedWithin)
//!          └─► exit
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_one_shot
//! ```

use std::time::Duration;

use fluentask::{Config, FluentTask, Runtime, TaskContext, TaskError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Build runtime configuration (defaults are fine for one-shot)
    let cfg = Config::default();

    // 2. No subscribers for simplicity
    let rt = Runtime::new(cfg, Vec::new());

    // 3. Define the task: perform on the blocking pool, deliver on the looper
    let task = FluentTask::named("answer")
        .set_performer(|question: &'static str, _: &TaskContext<()>| -> Result<String, TaskError> {
            println!("[answer] thinking about {question:?}");
            std::thread::sleep(Duration::from_millis(300));
            Ok("42".to_string())
        })
        .set_success_listener(|answer: String| println!("[answer] success: {answer}"))
        .set_failure_listener(|_: Option<String>| println!("[answer] failed"));

    // 4. Start it and wait for the outcome
    let handle = task.execute(&rt, "life, the universe and everything");
    let state = handle.join().await?;
    println!("[main] task finished in state {state:?}");

    // 5. Stop the runtime
    rt.shutdown().await?;
    Ok(())
}
