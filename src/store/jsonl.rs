// src/store/jsonl.rs
//! Directory of newline-delimited JSON snapshot units.
//!
//! Writes go to a hidden temp file in the same directory and are published by
//! hard-linking to the final unit name, which fails instead of overwriting when
//! another run already took that name. Readers only ever see complete units.

use chrono::{DateTime, Duration, Timelike, Utc};
use metrics::counter;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{parse_unit_name, unit_name, CorruptUnit, SnapshotStore, WindowScan, UNIT_EXT};
use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::metrics::{STORE_OBSERVATIONS_WRITTEN, STORE_UNITS_SKIPPED, STORE_UNITS_WRITTEN};
use crate::model::{Observation, SnapshotHandle};

const MAX_COLLISIONS: u32 = 1_000;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub struct JsonlSnapshotStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonlSnapshotStore {
    pub fn new(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    /// Store on the wall clock.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Arc::new(SystemClock))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Committed unit names, oldest first.
    pub fn list_units(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| !n.starts_with('.') && n.ends_with(&format!(".{UNIT_EXT}")))
            .collect();
        names.sort();
        Ok(names)
    }

    fn write_tmp(&self, observations: &[Observation]) -> StoreResult<PathBuf> {
        let tmp = self.root.join(format!(
            ".{}-{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        match write_lines(&tmp, observations) {
            Ok(()) => Ok(tmp),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    /// Link `tmp` to the first free unit name for `ts`.
    fn publish(&self, tmp: &Path, ts: DateTime<Utc>) -> StoreResult<(String, PathBuf)> {
        for collision in 0..MAX_COLLISIONS {
            let name = unit_name(ts, collision);
            let path = self.root.join(&name);
            match fs::hard_link(tmp, &path) {
                Ok(()) => return Ok((name, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StoreError::Write { unit: path, source }),
            }
        }
        Err(StoreError::Write {
            unit: self.root.join(unit_name(ts, MAX_COLLISIONS)),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "too many snapshot units for one second",
            ),
        })
    }

    fn read_unit(path: &Path) -> Result<Vec<Observation>, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut out = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let obs: Observation =
                serde_json::from_str(line).map_err(|e| format!("line {}: {e}", lineno + 1))?;
            out.push(obs);
        }
        Ok(out)
    }
}

impl SnapshotStore for JsonlSnapshotStore {
    fn append(&self, observations: &[Observation]) -> StoreResult<SnapshotHandle> {
        let Some(first) = observations.first() else {
            return Err(StoreError::EmptyBatch);
        };
        let timestamp = first.timestamp;
        if let Some(odd) = observations
            .iter()
            .find(|o| o.timestamp != timestamp || o.timestamp.nanosecond() != 0)
        {
            return Err(StoreError::MixedBatch {
                expected: timestamp,
                found: odd.timestamp,
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            unit: self.root.clone(),
            source,
        })?;

        let tmp = self.write_tmp(observations)?;
        let published = self.publish(&tmp, timestamp);
        let _ = fs::remove_file(&tmp);
        let (name, path) = published?;

        counter!(STORE_UNITS_WRITTEN).increment(1);
        counter!(STORE_OBSERVATIONS_WRITTEN).increment(observations.len() as u64);
        tracing::info!(
            target: "store",
            unit = %name,
            observations = observations.len(),
            "snapshot committed"
        );

        Ok(SnapshotHandle {
            name,
            path,
            timestamp,
            observations: observations.len(),
        })
    }

    fn scan_window(&self, window: Duration) -> WindowScan {
        let mut scan = WindowScan::default();
        if window <= Duration::zero() {
            return scan;
        }
        let now = self.clock.now();
        let start = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let names = match self.list_units() {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(target: "store", error = %e, root = %self.root.display(), "cannot list snapshot dir");
                return scan;
            }
        };

        for name in names {
            let path = self.root.join(&name);
            let Some(ts) = parse_unit_name(&name) else {
                skip(&mut scan, path, "unrecognised unit name".to_string());
                continue;
            };
            if ts < start || ts > now {
                continue;
            }
            match Self::read_unit(&path) {
                Ok(obs) => {
                    scan.units_read += 1;
                    // rows carry their own timestamp; a unit name only picks the file
                    scan.observations.extend(
                        obs.into_iter()
                            .filter(|o| o.timestamp >= start && o.timestamp <= now),
                    );
                }
                Err(reason) => skip(&mut scan, path, reason),
            }
        }
        scan
    }
}

fn write_lines(path: &Path, observations: &[Observation]) -> StoreResult<()> {
    let write_err = |source| StoreError::Write {
        unit: path.to_path_buf(),
        source,
    };
    let file = fs::File::create(path).map_err(write_err)?;
    let mut w = BufWriter::new(file);
    for obs in observations {
        serde_json::to_writer(&mut w, obs)?;
        w.write_all(b"\n").map_err(write_err)?;
    }
    let file = w.into_inner().map_err(|e| write_err(e.into_error()))?;
    file.sync_all().map_err(write_err)?;
    Ok(())
}

fn skip(scan: &mut WindowScan, path: PathBuf, reason: String) {
    tracing::warn!(target: "store", unit = %path.display(), %reason, "skipping unreadable snapshot unit");
    counter!(STORE_UNITS_SKIPPED).increment(1);
    scan.skipped.push(CorruptUnit { path, reason });
}
