// src/pipeline.rs
//! One pipeline run as a forward-only state machine:
//! `Idle -> Fetching -> Normalizing -> Persisting -> Aggregating -> Exporting -> Done`,
//! or `Failed` from any non-terminal state.

use metrics::{counter, gauge, histogram};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::{default_window, Aggregator, DEFAULT_TOP_N};
use crate::clock::Clock;
use crate::error::PipelineError;
use crate::export::SummarySink;
use crate::ingest::normalize_batch;
use crate::ingest::types::Fetcher;
use crate::metrics::{FETCH_DURATION_MS, PIPELINE_FAILURES, PIPELINE_LAST_RUN_TS, PIPELINE_RUNS};
use crate::model::{SnapshotHandle, Summary};
use crate::store::SnapshotStore;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Fetching,
    Normalizing,
    Persisting,
    Aggregating,
    Exporting,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub fetch_timeout: Duration,
    pub window: chrono::Duration,
    pub top_n: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            window: default_window(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Shared collaborators. Cheap to clone; each [`Pipeline::start`] makes a fresh run.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn SnapshotStore>,
    aggregator: Arc<Aggregator>,
    sink: Arc<dyn SummarySink>,
    clock: Arc<dyn Clock>,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn SnapshotStore>,
        aggregator: Arc<Aggregator>,
        sink: Arc<dyn SummarySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            store,
            aggregator,
            sink,
            clock,
            settings: RunSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn start(&self) -> PipelineRun {
        PipelineRun {
            parts: self.clone(),
            state: RunState::Idle,
            trail: vec![RunState::Idle],
            snapshot: None,
        }
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Every state entered, in order, starting with `Idle`.
    pub trail: Vec<RunState>,
    /// Set once `Persisting` committed a unit; stays set even if a later stage fails.
    pub snapshot: Option<SnapshotHandle>,
    pub outcome: Result<Summary, PipelineError>,
}

impl RunReport {
    pub fn state(&self) -> RunState {
        self.trail.last().copied().unwrap_or(RunState::Idle)
    }

    pub fn is_done(&self) -> bool {
        self.state() == RunState::Done
    }
}

pub struct PipelineRun {
    parts: Pipeline,
    state: RunState,
    trail: Vec<RunState>,
    snapshot: Option<SnapshotHandle>,
}

impl PipelineRun {
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Drive the run to a terminal state. Consumes the run; states are never re-entered.
    pub async fn run(mut self) -> RunReport {
        counter!(PIPELINE_RUNS).increment(1);
        let fetcher = self.parts.fetcher.name();

        let outcome = self.drive().await;
        match &outcome {
            Ok(summary) => {
                self.enter(RunState::Done);
                gauge!(PIPELINE_LAST_RUN_TS).set(self.parts.clock.now().timestamp() as f64);
                tracing::info!(
                    target: "pipeline",
                    fetcher,
                    unit = self.snapshot.as_ref().map(|h| h.name.as_str()).unwrap_or("-"),
                    trends = summary.trends.len(),
                    insights = summary.insights.len(),
                    "run done"
                );
            }
            Err(e) => {
                let at = self.state;
                self.enter(RunState::Failed);
                counter!(PIPELINE_FAILURES, "reason" => e.reason()).increment(1);
                tracing::warn!(
                    target: "pipeline",
                    fetcher,
                    failed_in = %at,
                    reason = e.reason(),
                    recoverable = e.is_recoverable(),
                    error = %e,
                    "run failed"
                );
            }
        }

        RunReport {
            trail: self.trail,
            snapshot: self.snapshot,
            outcome,
        }
    }

    async fn drive(&mut self) -> Result<Summary, PipelineError> {
        self.enter(RunState::Fetching);
        let timeout = self.parts.settings.fetch_timeout;
        let started = Instant::now();
        let fetched = tokio::time::timeout(timeout, self.parts.fetcher.fetch()).await;
        histogram!(FETCH_DURATION_MS).record(started.elapsed().as_secs_f64() * 1000.0);
        let raw = match fetched {
            Err(_) => return Err(PipelineError::FetchTimeout(timeout.as_secs())),
            Ok(Err(e)) => return Err(PipelineError::Fetch(format!("{e:#}"))),
            Ok(Ok(rows)) if rows.is_empty() => return Err(PipelineError::NoData),
            Ok(Ok(rows)) => rows,
        };

        self.enter(RunState::Normalizing);
        let (observations, _dropped) = normalize_batch(raw, self.parts.clock.now());
        if observations.is_empty() {
            return Err(PipelineError::NoData);
        }

        self.enter(RunState::Persisting);
        let handle = self.parts.store.append(&observations)?;
        self.snapshot = Some(handle);

        self.enter(RunState::Aggregating);
        let RunSettings { window, top_n, .. } = self.parts.settings;
        let summary = self.parts.aggregator.aggregate(window, top_n);

        self.enter(RunState::Exporting);
        self.parts
            .sink
            .export(&summary)
            .await
            .map_err(|e| PipelineError::Export(format!("{e:#}")))?;

        Ok(summary)
    }

    fn enter(&mut self, next: RunState) {
        debug_assert!(!self.state.is_terminal(), "run already finished");
        tracing::debug!(target: "pipeline", from = %self.state, to = %next, "state");
        self.state = next;
        self.trail.push(next);
    }
}
