// src/ingest/mod.rs
pub mod providers;
pub mod types;

use chrono::{DateTime, SubsecRound, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::category::categorize;
use crate::metrics::{INGEST_DROPPED, INGEST_RAW};
use crate::model::{Observation, RawTrend, MISSING_TRAFFIC};
use crate::traffic;

/// Normalize keyword text: decode entities, collapse whitespace, trim.
pub fn normalize_keyword(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Traffic text as stored: trimmed, or `"N/A"` when absent/blank.
pub fn normalize_traffic_text(s: Option<&str>) -> String {
    match s.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => MISSING_TRAFFIC.to_string(),
    }
}

/// Batch timestamps carry whole seconds so they agree with snapshot unit names.
pub fn batch_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0)
}

// Salt so two runs sharing a second still mint distinct ids.
static BATCH_SEQ: AtomicU64 = AtomicU64::new(0);

fn observation_id(batch: &str, seq: usize, keyword: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(batch.as_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(keyword.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Turn raw fetch rows into typed observations sharing one batch timestamp.
/// Returns the observations and the number of rows dropped for an empty keyword.
pub fn normalize_batch(raw: Vec<RawTrend>, at: DateTime<Utc>) -> (Vec<Observation>, usize) {
    let timestamp = batch_timestamp(at);
    let batch = format!(
        "{}#{}#{}",
        timestamp.to_rfc3339(),
        std::process::id(),
        BATCH_SEQ.fetch_add(1, Ordering::Relaxed)
    );

    counter!(INGEST_RAW).increment(raw.len() as u64);

    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(raw.len());
    for (seq, row) in raw.into_iter().enumerate() {
        let keyword = normalize_keyword(&row.keyword);
        if keyword.is_empty() {
            dropped += 1;
            continue;
        }
        let raw_traffic_text = normalize_traffic_text(row.traffic.as_deref());
        out.push(Observation {
            id: observation_id(&batch, seq, &keyword),
            timestamp,
            traffic_numeric: traffic::parse(&raw_traffic_text),
            category: categorize(&keyword),
            keyword,
            raw_traffic_text,
        });
    }

    counter!(INGEST_DROPPED).increment(dropped as u64);
    if dropped > 0 {
        tracing::debug!(target: "ingest", dropped, kept = out.len(), "dropped rows with empty keyword");
    }
    (out, dropped)
}
