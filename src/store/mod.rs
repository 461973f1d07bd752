// src/store/mod.rs
//! Append-only snapshot persistence.
//!
//! A snapshot unit holds every observation of one pipeline run. Units are
//! named from their batch timestamp (`YYYYMMDD_HHMMSS.jsonl`, with a `_NNN`
//! suffix when two runs land on the same second) so a directory listing is
//! already in chronological order.

pub mod jsonl;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::path::PathBuf;

use crate::error::StoreResult;
use crate::model::{Observation, SnapshotHandle};

pub use jsonl::JsonlSnapshotStore;

pub const UNIT_EXT: &str = "jsonl";
const STEM_FORMAT: &str = "%Y%m%d_%H%M%S";
const STEM_LEN: usize = 15;

pub trait SnapshotStore: Send + Sync {
    /// Persist one batch as a new unit. Either the whole batch becomes visible or nothing does.
    fn append(&self, observations: &[Observation]) -> StoreResult<SnapshotHandle>;

    /// Everything in units stamped within `[now - window, now]`, skipping unreadable units.
    fn load_window(&self, window: Duration) -> Vec<Observation> {
        self.scan_window(window).observations
    }

    fn scan_window(&self, window: Duration) -> WindowScan;
}

/// A unit that could not be read and was left out of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptUnit {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct WindowScan {
    pub observations: Vec<Observation>,
    pub units_read: usize,
    pub skipped: Vec<CorruptUnit>,
}

/// Unit file name for a batch timestamp and collision index.
pub fn unit_name(ts: DateTime<Utc>, collision: u32) -> String {
    let stem = ts.format(STEM_FORMAT);
    if collision == 0 {
        format!("{stem}.{UNIT_EXT}")
    } else {
        format!("{stem}_{collision:03}.{UNIT_EXT}")
    }
}

/// Inverse of [`unit_name`]. `None` for anything that is not a unit name.
pub fn parse_unit_name(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.strip_suffix(UNIT_EXT)?.strip_suffix('.')?;
    if stem.len() < STEM_LEN || !stem.is_char_boundary(STEM_LEN) {
        return None;
    }
    let (ts, rest) = stem.split_at(STEM_LEN);
    let suffix_ok = rest.is_empty()
        || rest
            .strip_prefix('_')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    if !suffix_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(ts, STEM_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
