//! # Example: task_cancel
//!
//! Demonstrates how to cancel a running task through its [`TaskHandle`].
//!
//! Shows how to:
//! - Start a long-running performer that polls [`TaskContext::is_cancelled`].
//! - Cancel it from the caller while it runs.
//! - Observe the failure listener and the `Cancelled` terminal state.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► execute("worker")
//!   │     └─► performer ticks every 200ms, publishing progress
//!   │
//!   ├─► sleep 1 second (let task run)
//!   ├─► handle.cancel()
//!   │     ├─► publish CancelRequested
//!   │     └─► performer sees cancellation, returns early
//!   │
//!   └─► handle.join() ─► Cancelled
//!         └─► failure listener(None)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example task_cancel
//! ```

use std::{sync::Arc, time::Duration};

use fluentask::{Config, FluentTask, Runtime, Subscribe, TaskContext, TaskError, TaskState};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== task_cancel example ===\n");

    // 1. Configure runtime
    let mut cfg = Config::default();
    cfg.grace = Duration::from_secs(5);
    cfg.bus_capacity = 256;

    // 2. Optional: add subscriber to see events (requires "logging" feature)
    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = {
        use fluentask::LogWriter;
        vec![Arc::new(LogWriter)]
    };
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    let rt = Runtime::new(cfg, subs);

    // 3. Define a worker that runs until cancelled
    let handle = FluentTask::named("worker")
        .set_performer(|_: (), ctx: &TaskContext<u32>| -> Result<u32, TaskError> {
            println!("[worker] started, will run until cancelled");
            let mut counter = 0u32;
            while !ctx.is_cancelled() {
                counter += 1;
                ctx.publish_progress(counter);
                std::thread::sleep(Duration::from_millis(200));
            }
            println!("[worker] detected cancellation, exiting");
            Ok(counter)
        })
        .set_progress_listener(|n: u32| println!("[worker] tick #{n}"))
        .set_success_listener(|n: u32| println!("[worker] finished after {n} ticks"))
        .set_failure_listener(|n: Option<u32>| println!("[worker] cancelled, value: {n:?}"))
        .execute(&rt, ());

    // 4. Let it run, then cancel
    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = handle.state();
    println!("\n[main] state before cancel: {before:?}");
    anyhow::ensure!(before.is_running(), "worker should still be performing");
    handle.cancel();

    // 5. Wait for delivery
    let state = handle.join().await?;
    println!("[main] state after cancel: {state:?}");
    anyhow::ensure!(state == TaskState::Cancelled, "worker should end cancelled");
    anyhow::ensure!(handle.last_failure().is_none(), "cancel is not a failure");

    rt.shutdown().await?;
    println!("\n=== example completed successfully ===");
    Ok(())
}
