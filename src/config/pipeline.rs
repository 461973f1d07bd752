// src/config/pipeline.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aggregate::{DEFAULT_SCORE_WEIGHT, DEFAULT_TOP_N};
use crate::insight::{InsightEngine, DEFAULT_SEASONAL_PATTERN};
use crate::pipeline::RunSettings;

const ENV_PATH: &str = "TRENDS_CONFIG_PATH";
const ENV_DATA_DIR: &str = "TRENDS_DATA_DIR";
const ENV_EXPORT_PATH: &str = "TRENDS_EXPORT_PATH";
const ENV_TOP_N: &str = "TRENDS_TOP_N";
const ENV_WINDOW_HOURS: &str = "TRENDS_WINDOW_HOURS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding snapshot units.
    pub data_dir: PathBuf,
    /// Where the summary document is written.
    pub export_path: PathBuf,
    pub window_hours: i64,
    pub top_n: usize,
    pub score_weight: f64,
    pub fetch_timeout_secs: u64,
    pub geo: String,
    /// Explicit feed URL; overrides `geo`.
    pub feed_url: Option<String>,
    /// Absent: run once and exit.
    pub interval_secs: Option<u64>,
    pub seasonal_pattern: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/snapshots"),
            export_path: PathBuf::from("web/data.json"),
            window_hours: 7 * 24,
            top_n: DEFAULT_TOP_N,
            score_weight: DEFAULT_SCORE_WEIGHT,
            fetch_timeout_secs: 60,
            geo: "US".to_string(),
            feed_url: None,
            interval_secs: None,
            seasonal_pattern: DEFAULT_SEASONAL_PATTERN.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path. TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: PipelineConfig = match ext.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("parsing TOML config {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing JSON config {}", path.display()))?,
            other => bail!("unsupported config format {other:?} for {}", path.display()),
        };
        Ok(cfg)
    }

    /// Resolve config with env var + fallbacks, then env overrides, then validate:
    /// 1) $TRENDS_CONFIG_PATH (must exist)
    /// 2) config/trends.toml
    /// 3) config/trends.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_PATH} points to non-existent path {}", pb.display()));
        }
        let toml_p = PathBuf::from("config/trends.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/trends.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_nonempty(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_nonempty(ENV_EXPORT_PATH) {
            self.export_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<usize>(ENV_TOP_N)? {
            self.top_n = v;
        }
        if let Some(v) = env_parse::<i64>(ENV_WINDOW_HOURS)? {
            self.window_hours = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            bail!("top_n must be at least 1");
        }
        if !(self.score_weight >= 0.0 && self.score_weight.is_finite()) {
            bail!("score_weight must be a finite number >= 0, got {}", self.score_weight);
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be at least 1");
        }
        if self.interval_secs == Some(0) {
            bail!("interval_secs must be at least 1 when set");
        }
        self.insight_engine()?;
        Ok(())
    }

    /// Trailing window; zero or negative hours select nothing.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.window_hours).unwrap_or_else(chrono::Duration::zero)
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn interval(&self) -> Option<std::time::Duration> {
        self.interval_secs.map(std::time::Duration::from_secs)
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            fetch_timeout: self.fetch_timeout(),
            window: self.window(),
            top_n: self.top_n,
        }
    }

    pub fn insight_engine(&self) -> Result<InsightEngine> {
        InsightEngine::new(&self.seasonal_pattern)
            .with_context(|| format!("invalid seasonal_pattern {:?}", self.seasonal_pattern))
    }

    /// Feed to poll: explicit `feed_url`, else the public feed for `geo`.
    pub fn feed(&self) -> String {
        match self.feed_url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => crate::ingest::providers::trends_rss::feed_url(&self.geo),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_nonempty(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {key}={v:?}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn clear_env() {
        for k in [ENV_PATH, ENV_DATA_DIR, ENV_EXPORT_PATH, ENV_TOP_N, ENV_WINDOW_HOURS] {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.window(), chrono::Duration::days(7));
        assert_eq!(cfg.top_n, 30);
        assert_eq!(cfg.feed(), "https://trends.google.com/trending/rss?geo=US");
        assert_eq!(cfg.interval(), None);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let t = dir.path().join("c.toml");
        fs::write(&t, "top_n = 5\ngeo = \"gb\"\ninterval_secs = 3600\n").unwrap();
        let cfg = PipelineConfig::load_from(&t).unwrap();
        assert_eq!(cfg.top_n, 5);
        assert_eq!(cfg.interval_secs, Some(3600));
        assert_eq!(cfg.score_weight, 0.1);
        assert_eq!(cfg.feed(), "https://trends.google.com/trending/rss?geo=GB");

        let j = dir.path().join("c.json");
        fs::write(&j, r#"{"window_hours": 24, "feed_url": "http://localhost/rss"}"#).unwrap();
        let cfg = PipelineConfig::load_from(&j).unwrap();
        assert_eq!(cfg.window(), chrono::Duration::hours(24));
        assert_eq!(cfg.feed(), "http://localhost/rss");

        let y = dir.path().join("c.yaml");
        fs::write(&y, "top_n: 5").unwrap();
        assert!(PipelineConfig::load_from(&y).is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = PipelineConfig {
            top_n: 0,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.top_n = 1;
        cfg.score_weight = -0.5;
        assert!(cfg.validate().is_err());
        cfg.score_weight = 0.0;
        cfg.fetch_timeout_secs = 0;
        assert!(cfg.validate().is_err());
        cfg.fetch_timeout_secs = 1;
        cfg.seasonal_pattern = "(".into();
        assert!(cfg.validate().is_err());
        cfg.seasonal_pattern = "x".into();
        cfg.validate().unwrap();
    }

    #[test]
    fn non_positive_window_hours_map_to_empty_window() {
        let cfg = PipelineConfig {
            window_hours: -4,
            ..PipelineConfig::default()
        };
        assert!(cfg.window() <= chrono::Duration::zero());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks_then_overrides() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        clear_env();

        // no files in temp CWD
        assert_eq!(PipelineConfig::load_default().unwrap(), PipelineConfig::default());

        fs::create_dir_all("config").unwrap();
        fs::write("config/trends.json", r#"{"top_n": 7}"#).unwrap();
        assert_eq!(PipelineConfig::load_default().unwrap().top_n, 7);

        // toml wins over json
        fs::write("config/trends.toml", "top_n = 9").unwrap();
        assert_eq!(PipelineConfig::load_default().unwrap().top_n, 9);

        // explicit path wins over both
        let p = tmp.path().join("explicit.json");
        fs::write(&p, r#"{"top_n": 11}"#).unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        assert_eq!(PipelineConfig::load_default().unwrap().top_n, 11);

        // env overrides apply last
        env::set_var(ENV_TOP_N, "3");
        env::set_var(ENV_DATA_DIR, "/tmp/snaps");
        let cfg = PipelineConfig::load_default().unwrap();
        assert_eq!(cfg.top_n, 3);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/snaps"));

        env::set_var(ENV_TOP_N, "lots");
        assert!(PipelineConfig::load_default().is_err());

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(PipelineConfig::load_default().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
