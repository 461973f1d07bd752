// src/model.rs
//! Typed records flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::category::Category;

/// Placeholder stored when the source row carried no volume text.
pub const MISSING_TRAFFIC: &str = "N/A";

/// One row as returned by a fetcher, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTrend {
    pub keyword: String,
    pub traffic: Option<String>,
}

impl RawTrend {
    pub fn new(keyword: impl Into<String>, traffic: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            traffic: Some(traffic.into()),
        }
    }
}

/// One crawl-time sighting of a keyword. Field order matches the snapshot line format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub keyword: String,
    pub traffic_numeric: u64,
    pub category: Category,
    pub raw_traffic_text: String,
}

/// Receipt for a committed snapshot unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    pub name: String,
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub observations: usize,
}

/// One ranked row: every observation of `keyword` inside the window folded together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTrend {
    pub keyword: String,
    pub score: f64,
    pub max_traffic_numeric: u64,
    pub category: Category,
    pub last_seen: DateTime<Utc>,
    pub frequency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub context: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub trends: Vec<AggregatedTrend>,
    /// Composition of the whole window, not only the ranked top-N.
    pub category_stats: BTreeMap<Category, usize>,
    pub insights: Vec<Insight>,
}

impl Summary {
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            trends: Vec::new(),
            category_stats: BTreeMap::new(),
            insights: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trends.is_empty()
    }
}
