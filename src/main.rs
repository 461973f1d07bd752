//! Trends aggregator binary entrypoint.
//! Loads config, wires fetcher/store/aggregator/exporter, then runs the
//! pipeline once or on a fixed interval.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trends_aggregator::clock::{Clock, SystemClock};
use trends_aggregator::ingest::providers::trends_rss::TrendsRssFetcher;
use trends_aggregator::ingest::types::Fetcher;
use trends_aggregator::scheduler::spawn_pipeline_scheduler;
use trends_aggregator::{
    metrics, Aggregator, JsonFileExporter, JsonlSnapshotStore, Pipeline, PipelineConfig,
};

/// Offline runs: read the feed from this file instead of the network.
const ENV_FIXTURE: &str = "TRENDS_FIXTURE";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trends_aggregator=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_fetcher(cfg: &PipelineConfig) -> Result<Arc<dyn Fetcher>> {
    if let Ok(path) = std::env::var(ENV_FIXTURE) {
        let xml = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {ENV_FIXTURE}={path}"))?;
        return Ok(Arc::new(TrendsRssFetcher::from_fixture(&xml)));
    }
    network_fetcher(cfg)
}

#[cfg(feature = "fetch-http")]
fn network_fetcher(cfg: &PipelineConfig) -> Result<Arc<dyn Fetcher>> {
    let feed = cfg.feed();
    tracing::info!(%feed, "polling trends feed");
    Ok(Arc::new(TrendsRssFetcher::from_url(feed)?))
}

#[cfg(not(feature = "fetch-http"))]
fn network_fetcher(_cfg: &PipelineConfig) -> Result<Arc<dyn Fetcher>> {
    bail!("built without `fetch-http`; set {ENV_FIXTURE} to a feed file")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("parsing METRICS_ADDR={addr}"))?;
        metrics::install_prometheus(addr)?;
        tracing::info!(%addr, "prometheus exporter listening");
    }

    let cfg = PipelineConfig::load_default().context("loading pipeline config")?;
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        export = %cfg.export_path.display(),
        window_hours = cfg.window_hours,
        top_n = cfg.top_n,
        "config loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(JsonlSnapshotStore::new(&cfg.data_dir, clock.clone()));
    let aggregator = Arc::new(
        Aggregator::new(store.clone(), clock.clone())
            .with_weight(cfg.score_weight)
            .with_insights(cfg.insight_engine()?),
    );
    let sink = Arc::new(JsonFileExporter::new(&cfg.export_path));
    let pipeline = Pipeline::new(build_fetcher(&cfg)?, store, aggregator, sink, clock)
        .with_settings(cfg.run_settings());

    match cfg.interval() {
        Some(every) => {
            let handle = spawn_pipeline_scheduler(every, pipeline);
            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            tracing::info!("shutting down scheduler");
            handle.abort();
            Ok(())
        }
        None => {
            let report = pipeline.start().run().await;
            match report.outcome {
                Ok(_) => Ok(()),
                Err(e) => bail!("pipeline run failed: {e}"),
            }
        }
    }
}
