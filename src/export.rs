// src/export.rs
//! Summary export: the `SummarySink` boundary and a JSON file writer.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::model::{AggregatedTrend, Insight, Summary};

pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[async_trait]
pub trait SummarySink: Send + Sync {
    async fn export(&self, summary: &Summary) -> Result<()>;
}

/// On-disk document consumed by the dashboard.
#[derive(Debug, Serialize)]
pub struct SummaryDocument<'a> {
    pub last_updated: String,
    pub generated_at: String,
    pub trends: &'a [AggregatedTrend],
    pub category_stats: &'a BTreeMap<Category, usize>,
    pub insights: &'a [Insight],
}

impl<'a> SummaryDocument<'a> {
    pub fn from_summary(summary: &'a Summary) -> Self {
        Self {
            last_updated: format_last_updated(summary.generated_at),
            generated_at: summary
                .generated_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            trends: &summary.trends,
            category_stats: &summary.category_stats,
            insights: &summary.insights,
        }
    }
}

pub fn format_last_updated(at: DateTime<Utc>) -> String {
    at.format(LAST_UPDATED_FORMAT).to_string()
}

/// Writes the summary document to one path, replacing it atomically.
pub struct JsonFileExporter {
    path: PathBuf,
}

impl JsonFileExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, body: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating export dir {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let res = (|| -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(body)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if res.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        res.with_context(|| format!("writing export {}", self.path.display()))
    }
}

#[async_trait]
impl SummarySink for JsonFileExporter {
    async fn export(&self, summary: &Summary) -> Result<()> {
        let doc = SummaryDocument::from_summary(summary);
        let body = serde_json::to_vec_pretty(&doc).context("encoding summary")?;
        self.write(&body)?;
        tracing::info!(
            target: "pipeline",
            path = %self.path.display(),
            trends = summary.trends.len(),
            "summary exported"
        );
        Ok(())
    }
}
