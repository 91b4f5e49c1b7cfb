// src/config/mod.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";

pub const ENV_TICK_MS: &str = "DASHBOARD_TICK_MS";
pub const ENV_NEWS_POLL_MS: &str = "DASHBOARD_NEWS_POLL_MS";
pub const ENV_POLL_PROBABILITY: &str = "DASHBOARD_POLL_PROBABILITY";
pub const ENV_METRICS: &str = "DASHBOARD_METRICS";

/// Shortest period accepted for either recurring task.
const MIN_INTERVAL_MS: u64 = 50;

/// What `add` does when the symbol is already tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append anyway; two records may share a symbol.
    #[default]
    Allow,
    /// Fail with `ValidationError::DuplicateSymbol`.
    Reject,
}

/// Inclusive-exclusive latency window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    fn sanitized(self) -> Self {
        if self.min_ms > self.max_ms {
            Self::new(self.max_ms, self.min_ms)
        } else {
            self
        }
    }
}

fn default_symbol_latency() -> LatencyRange {
    LatencyRange::new(300, 1000)
}
fn default_market_latency() -> LatencyRange {
    LatencyRange::new(500, 1500)
}
fn default_poll_latency() -> LatencyRange {
    LatencyRange::new(100, 300)
}
fn default_poll_probability() -> f64 {
    0.3
}

/// Knobs of the mock news generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_symbol_latency")]
    pub symbol_latency: LatencyRange,
    #[serde(default = "default_market_latency")]
    pub market_latency: LatencyRange,
    #[serde(default = "default_poll_latency")]
    pub poll_latency: LatencyRange,
    /// Chance that one background poll yields a fresh article.
    #[serde(default = "default_poll_probability")]
    pub poll_probability: f64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            symbol_latency: default_symbol_latency(),
            market_latency: default_market_latency(),
            poll_latency: default_poll_latency(),
            poll_probability: default_poll_probability(),
        }
    }
}

impl NewsConfig {
    /// No simulated latency; every poll produces an article.
    pub fn instant() -> Self {
        Self {
            symbol_latency: LatencyRange::zero(),
            market_latency: LatencyRange::zero(),
            poll_latency: LatencyRange::zero(),
            poll_probability: 1.0,
        }
    }
}

/// Starter watchlist entry with an explicit quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedStock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub tick_interval_ms: u64,
    pub news_poll_interval_ms: u64,
    pub selected_news_count: usize,
    pub market_news_per_symbol: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub metrics_enabled: bool,
    pub news: NewsConfig,
    pub watchlist: Vec<SeedStock>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 3_000,
            news_poll_interval_ms: 10_000,
            selected_news_count: 8,
            market_news_per_symbol: 3,
            duplicate_policy: DuplicatePolicy::Allow,
            metrics_enabled: true,
            news: NewsConfig::default(),
            watchlist: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn news_poll_interval(&self) -> Duration {
        Duration::from_millis(self.news_poll_interval_ms)
    }

    /// Parse a TOML document and sanitize it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: DashboardConfig = toml::from_str(s).context("parse dashboard config")?;
        Ok(cfg.sanitized())
    }

    /// Load from an explicit path (TOML).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid dashboard config in {}", path.display()))
    }

    /// Load config using env var + fallbacks, then apply env overrides:
    /// 1) $DASHBOARD_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::load_from(&default_path)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides())
    }

    /// Apply `DASHBOARD_*` overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = env_parse::<u64>(ENV_TICK_MS) {
            self.tick_interval_ms = ms;
        }
        if let Some(ms) = env_parse::<u64>(ENV_NEWS_POLL_MS) {
            self.news_poll_interval_ms = ms;
        }
        if let Some(p) = env_parse::<f64>(ENV_POLL_PROBABILITY) {
            self.news.poll_probability = p;
        }
        if let Ok(v) = std::env::var(ENV_METRICS) {
            self.metrics_enabled = v.trim() == "1";
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Self {
        self.tick_interval_ms = self.tick_interval_ms.max(MIN_INTERVAL_MS);
        self.news_poll_interval_ms = self.news_poll_interval_ms.max(MIN_INTERVAL_MS);
        if !self.news.poll_probability.is_finite() {
            self.news.poll_probability = default_poll_probability();
        }
        self.news.poll_probability = self.news.poll_probability.clamp(0.0, 1.0);
        self.news.symbol_latency = self.news.symbol_latency.sanitized();
        self.news.market_latency = self.news.market_latency.sanitized();
        self.news.poll_latency = self.news.poll_latency.sanitized();
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
