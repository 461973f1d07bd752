// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod category;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod traffic;

// Ingestion and persistence
pub mod ingest;
pub mod store;

// Ranking and commentary
pub mod aggregate;
pub mod insight;

// Run orchestration
pub mod export;
pub mod pipeline;
pub mod scheduler;

pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Aggregator;
pub use crate::category::{categorize, Category};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::PipelineConfig;
pub use crate::error::{PipelineError, StoreError};
pub use crate::export::{JsonFileExporter, SummarySink};
pub use crate::ingest::types::Fetcher;
pub use crate::model::{AggregatedTrend, Insight, Observation, RawTrend, SnapshotHandle, Summary};
pub use crate::pipeline::{Pipeline, PipelineRun, RunReport, RunSettings, RunState};
pub use crate::store::{JsonlSnapshotStore, SnapshotStore};
