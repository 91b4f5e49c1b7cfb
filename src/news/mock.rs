// src/news/mock.rs
//! Synthetic news with simulated network latency.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::catalog::{self, HEADLINE_TEMPLATES, PUBLISHERS};
use super::{sort_newest_first, NewsSource};
use crate::config::{LatencyRange, NewsConfig};
use crate::error::FetchError;
use crate::model::NewsArticle;

/// How far back a generated `published_at` may lie.
const LOOKBACK_MS: i64 = 7 * 24 * 3600 * 1000;

/// Source of "now" for ids and publication times.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct MockNewsGenerator {
    cfg: NewsConfig,
    rng: Mutex<StdRng>,
    clock: Clock,
}

impl MockNewsGenerator {
    pub fn new(mut cfg: NewsConfig) -> Self {
        cfg.poll_probability = if cfg.poll_probability.is_finite() {
            cfg.poll_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            cfg,
            rng: Mutex::new(StdRng::from_os_rng()),
            clock: Arc::new(Utc::now),
        }
    }

    /// Reproducible headlines, sources and timestamps.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn with_clock<F>(self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    pub fn config(&self) -> &NewsConfig {
        &self.cfg
    }

    fn pick_delay(&self, range: LatencyRange) -> Duration {
        if range.max_ms <= range.min_ms {
            return Duration::from_millis(range.min_ms);
        }
        let ms = self
            .rng
            .lock()
            .expect("news rng mutex poisoned")
            .random_range(range.min_ms..range.max_ms);
        Duration::from_millis(ms)
    }

    async fn simulate_latency(&self, range: LatencyRange) {
        let delay = self.pick_delay(range);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// `count` articles for `symbol`, ids `{symbol}-{i}-{now millis}`.
    fn generate(&self, symbol: &str, count: usize, now: DateTime<Utc>) -> Vec<NewsArticle> {
        let stamp = now.timestamp_millis();
        let mut rng = self.rng.lock().expect("news rng mutex poisoned");
        (0..count)
            .map(|i| {
                let template = rng.random_range(0..HEADLINE_TEMPLATES.len());
                let publisher = PUBLISHERS[rng.random_range(0..PUBLISHERS.len())];
                let age = ChronoDuration::milliseconds(rng.random_range(0..LOOKBACK_MS));
                NewsArticle {
                    id: format!("{symbol}-{i}-{stamp}"),
                    headline: catalog::headline(template, symbol),
                    summary: Some(catalog::summary(symbol)),
                    published_at: now - age,
                    source: publisher.to_string(),
                    related_symbol: Some(symbol.to_string()),
                    url: catalog::article_url(symbol, i),
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl NewsSource for MockNewsGenerator {
    async fn for_symbol(&self, symbol: &str, count: usize) -> Result<Vec<NewsArticle>, FetchError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Ok(Vec::new());
        }
        self.simulate_latency(self.cfg.symbol_latency).await;
        let out = self.generate(symbol, count, (self.clock)());
        tracing::debug!(target: "news", %symbol, count = out.len(), "symbol news generated");
        Ok(out)
    }

    async fn for_all_symbols(
        &self,
        symbols: &[String],
        per_symbol: usize,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        // Repeated symbols would produce colliding ids within one batch.
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && seen.insert(*s))
            .collect();
        if distinct.is_empty() {
            return Ok(Vec::new());
        }

        self.simulate_latency(self.cfg.market_latency).await;
        let now = (self.clock)();
        let mut all = Vec::with_capacity(distinct.len() * per_symbol);
        for s in distinct {
            all.extend(self.generate(s, per_symbol, now));
        }
        sort_newest_first(&mut all);
        tracing::debug!(target: "news", count = all.len(), "market news generated");
        Ok(all)
    }

    async fn poll_for_new(
        &self,
        existing_ids: &HashSet<String>,
        symbols: &[String],
    ) -> Result<Vec<NewsArticle>, FetchError> {
        let candidates: Vec<&str> = symbols
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        self.simulate_latency(self.cfg.poll_latency).await;

        let picked = {
            let mut rng = self.rng.lock().expect("news rng mutex poisoned");
            if rng.random_bool(self.cfg.poll_probability) {
                Some(candidates[rng.random_range(0..candidates.len())])
            } else {
                None
            }
        };
        let Some(symbol) = picked else {
            return Ok(Vec::new());
        };

        let mut fresh = self.generate(symbol, 1, (self.clock)());
        fresh.retain(|a| !existing_ids.contains(&a.id));
        Ok(fresh)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
