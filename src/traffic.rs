// src/traffic.rs
//! Search-volume text → numeric magnitude.
//!
//! Takes the first run of digits (comma thousands groups allowed) and an
//! optional unit right after it: `万` ×10 000, `M` ×1 000 000, `K` ×1 000.
//! Anything unparseable degrades to 0 instead of failing ingestion.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_VOLUME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:,[0-9]{3})*)(万|[MmKk])?").expect("volume regex"));

fn multiplier(unit: Option<&str>) -> u64 {
    match unit {
        Some("万") => 10_000,
        Some("M") | Some("m") => 1_000_000,
        Some("K") | Some("k") => 1_000,
        _ => 1,
    }
}

/// Parse a human-readable volume like `"500万+ 次搜索"` or `"200,000+"`.
pub fn parse(raw: &str) -> u64 {
    let Some(caps) = RE_VOLUME.captures(raw) else {
        return 0;
    };
    let digits: String = caps[1].chars().filter(|c| *c != ',').collect();
    let Ok(base) = digits.parse::<u64>() else {
        return 0;
    };
    base.saturating_mul(multiplier(caps.get(2).map(|m| m.as_str())))
}

/// Tiered heuristic from before `traffic_numeric` existed.
#[deprecated(note = "ranking uses the frequency-weighted score; kept for old reports only")]
pub fn legacy_tier_score(raw: &str) -> u32 {
    let bonus = if raw.contains("500万+") {
        10
    } else if raw.contains("200万+") {
        5
    } else if raw.contains("100万+") {
        3
    } else if raw.contains("50万+") {
        2
    } else {
        0
    };
    1 + bonus
}
