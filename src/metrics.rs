// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const PIPELINE_RUNS: &str = "pipeline_runs_total";
pub const PIPELINE_FAILURES: &str = "pipeline_failures_total";
pub const PIPELINE_LAST_RUN_TS: &str = "pipeline_last_run_ts";
pub const FETCH_DURATION_MS: &str = "fetch_duration_ms";
pub const INGEST_RAW: &str = "ingest_raw_total";
pub const INGEST_DROPPED: &str = "ingest_dropped_total";
pub const STORE_UNITS_WRITTEN: &str = "store_units_written_total";
pub const STORE_OBSERVATIONS_WRITTEN: &str = "store_observations_written_total";
pub const STORE_UNITS_SKIPPED: &str = "store_units_skipped_total";
pub const AGGREGATE_GROUPS: &str = "aggregate_groups";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(PIPELINE_RUNS, "Pipeline runs started.");
        describe_counter!(
            PIPELINE_FAILURES,
            "Pipeline runs that ended in Failed, by reason."
        );
        describe_gauge!(PIPELINE_LAST_RUN_TS, "Unix ts when a pipeline run last finished.");
        describe_histogram!(FETCH_DURATION_MS, "Fetcher call time in milliseconds.");
        describe_counter!(INGEST_RAW, "Raw rows returned by fetchers.");
        describe_counter!(
            INGEST_DROPPED,
            "Raw rows dropped during normalization (empty keyword)."
        );
        describe_counter!(STORE_UNITS_WRITTEN, "Snapshot units committed.");
        describe_counter!(
            STORE_OBSERVATIONS_WRITTEN,
            "Observations committed inside snapshot units."
        );
        describe_counter!(
            STORE_UNITS_SKIPPED,
            "Corrupt or unreadable snapshot units skipped while loading a window."
        );
        describe_gauge!(AGGREGATE_GROUPS, "Distinct keywords in the last aggregated window.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
pub fn install_prometheus(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus: install exporter: {e}"))?;
    ensure_described();
    Ok(())
}
