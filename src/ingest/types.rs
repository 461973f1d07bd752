// src/ingest/types.rs
use anyhow::Result;

use crate::model::RawTrend;

/// External source of raw `(keyword, traffic)` rows.
///
/// Implementations should drop exact repeats; rows that survive count as
/// separate contributions downstream.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawTrend>>;
    fn name(&self) -> &'static str;
}
