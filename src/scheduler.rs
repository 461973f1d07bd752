// src/scheduler.rs
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::{Pipeline, RunReport};

/// Tick every `interval` and spawn `make_run()` as its own task.
///
/// Runs are independent: a slow run does not delay the next tick, and two runs
/// may overlap. The first tick fires immediately.
pub fn spawn_scheduler<F, Fut>(interval: Duration, mut make_run: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = RunReport> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            tick += 1;
            tracing::debug!(target: "scheduler", tick, "spawning pipeline run");
            let run = make_run();
            tokio::spawn(async move {
                let report = run.await;
                tracing::debug!(
                    target: "scheduler",
                    tick,
                    state = %report.state(),
                    "scheduled run finished"
                );
            });
        }
    })
}

/// Periodic runs of one pipeline.
pub fn spawn_pipeline_scheduler(interval: Duration, pipeline: Pipeline) -> JoinHandle<()> {
    tracing::info!(target: "scheduler", interval_secs = interval.as_secs(), "scheduler started");
    spawn_scheduler(interval, move || pipeline.start().run())
}
