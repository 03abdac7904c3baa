//! # Example: progress_pipeline
//!
//! A task that reports progress from the background context and transforms its
//! intermediate value before delivery, with the built-in [`LogWriter`] printing
//! runtime events.
//!
//! Demonstrates how to:
//! - Publish progress via [`TaskContext::publish_progress`].
//! - Convert the intermediate value with a transformer.
//! - Observe the result on the background context with a completion listener.
//! - Route a failing transformer to the failure listener.
//!
//! ## Flow
//! ```text
//! performer ──progress(1..=5)──► Looper ──► progress listener
//!    │ Ok(Vec<u32>)
//! transformer ─► Summary
//!    │
//! completion(&Summary)   (background)
//!    │
//! Looper ──► success listener(Summary)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example progress_pipeline --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use fluentask::{Config, FluentTask, LogWriter, Runtime, Subscribe, TaskContext, TaskError};

#[derive(Debug)]
struct Summary {
    count: usize,
    total: u32,
}

fn load_chunks(chunks: u32, ctx: &TaskContext<u32>) -> Result<Vec<u32>, TaskError> {
    let mut loaded = Vec::new();
    for chunk in 1..=chunks {
        if ctx.is_cancelled() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
        loaded.push(chunk * 10);
        ctx.publish_progress(chunk);
    }
    Ok(loaded)
}

fn summarize(values: Vec<u32>) -> Result<Summary, TaskError> {
    if values.is_empty() {
        return Err(TaskError::fail("nothing loaded"));
    }
    Ok(Summary {
        count: values.len(),
        total: values.iter().sum(),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let rt = Runtime::builder(Config::default()).with_subscribers(subs).build();

    // 1. Happy path: progress, transform, completion, success
    let ok = FluentTask::named("load")
        .set_performer(load_chunks)
        .set_transformer(summarize)
        .set_progress_listener(|chunk: u32| println!("[load] chunk {chunk}/5"))
        .set_completion_listener(|s: &Summary| println!("[load] completed in background: {s:?}"))
        .set_success_listener(|s: Summary| println!("[load] {} chunks, total {}", s.count, s.total))
        .execute(&rt, 5);

    // 2. Transformer failure: the failure listener runs, without a value
    let empty = FluentTask::named("load-empty")
        .set_performer(load_chunks)
        .set_transformer(summarize)
        .set_failure_listener(|s: Option<Summary>| println!("[load-empty] failed, value: {s:?}"))
        .execute(&rt, 0);

    println!("[main] load -> {:?}", ok.join().await?);
    println!("[main] load-empty -> {:?}", empty.join().await?);
    if let Some(err) = empty.last_failure() {
        println!("[main] load-empty last failure: {err}");
    }

    rt.shutdown().await?;
    Ok(())
}
