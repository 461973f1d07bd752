// src/error.rs
//! Error taxonomy for a pipeline run.
//!
//! Fetch failures and timeouts are recoverable by re-running later. `NoData`,
//! `StorageWrite` and `Export` end the current run. Corrupt snapshot units are
//! not errors at this level: the store reports and skips them.

use std::path::PathBuf;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("writing snapshot unit {unit}: {source}")]
    Write {
        unit: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to write an empty snapshot")]
    EmptyBatch,

    #[error("snapshot batch must share one whole-second timestamp, found {found} alongside {expected}")]
    MixedBatch {
        expected: chrono::DateTime<chrono::Utc>,
        found: chrono::DateTime<chrono::Utc>,
    },

    #[error("encoding observation: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("fetch timed out after {0}s")]
    FetchTimeout(u64),

    #[error("no usable observations in fetch result")]
    NoData,

    #[error("snapshot write failed: {0}")]
    StorageWrite(#[from] StoreError),

    #[error("export failed: {0}")]
    Export(String),
}

impl PipelineError {
    /// Whether re-running the whole pipeline later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Fetch(_) | PipelineError::FetchTimeout(_))
    }

    /// Short stable label, used as a metric tag.
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::FetchTimeout(_) => "fetch_timeout",
            PipelineError::NoData => "no_data",
            PipelineError::StorageWrite(_) => "storage_write",
            PipelineError::Export(_) => "export",
        }
    }
}
