//! # Watchlist Store
//! Sole authority over the tracked symbols and their simulated prices.
//!
//! Every read hands out a snapshot copy; callers never see the live list.
//! Prices drift by a uniform random step on each `tick` and never fall
//! below [`MIN_PRICE`].

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{DuplicatePolicy, SeedStock};
use crate::error::ValidationError;
use crate::model::{round2, SymbolRecord, MIN_PRICE};

/// Storage seam between the controller and whatever provides quotes.
pub trait WatchlistStore: Send + Sync {
    /// Snapshot of the current records, in insertion order.
    fn list(&self) -> Vec<SymbolRecord>;

    /// Track a new symbol. Both fields are trimmed; the symbol is uppercased.
    fn add(&self, symbol: &str, display_name: &str) -> Result<SymbolRecord, ValidationError>;

    /// Remove the first record whose stored symbol equals `symbol` exactly.
    fn remove(&self, symbol: &str) -> bool;

    /// Advance every price one step and return a fresh snapshot.
    fn tick(&self) -> Vec<SymbolRecord>;
}

/// In-memory watchlist with randomized quotes.
pub struct SimulatedWatchlist {
    inner: Mutex<Inner>,
    policy: DuplicatePolicy,
}

struct Inner {
    records: Vec<SymbolRecord>,
    rng: StdRng,
}

impl Default for SimulatedWatchlist {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedWatchlist {
    /// Empty watchlist seeded from the OS RNG.
    pub fn new() -> Self {
        Self::build(Vec::new(), StdRng::from_os_rng(), DuplicatePolicy::Allow)
    }

    /// Empty watchlist with a fixed RNG seed (reproducible prices).
    pub fn with_seed(seed: u64) -> Self {
        Self::build(Vec::new(), StdRng::seed_from_u64(seed), DuplicatePolicy::Allow)
    }

    /// Pre-populated watchlist. Records are normalized like `add` input;
    /// blank entries are dropped and prices clamped to the floor.
    pub fn with_records(records: Vec<SymbolRecord>) -> Self {
        let records = records.into_iter().filter_map(normalize_record).collect();
        Self::build(records, StdRng::from_os_rng(), DuplicatePolicy::Allow)
    }

    /// Build from configured starter stocks. Duplicates are skipped when
    /// the policy rejects them.
    pub fn from_seeds(seeds: &[SeedStock], policy: DuplicatePolicy) -> Self {
        let mut records: Vec<SymbolRecord> = Vec::with_capacity(seeds.len());
        for s in seeds {
            let Some(rec) = normalize_record(SymbolRecord {
                symbol: s.symbol.clone(),
                display_name: s.name.clone(),
                price: s.price,
                absolute_change: s.change,
                percent_change: s.change_percent,
            }) else {
                tracing::warn!(target: "watchlist", symbol = %s.symbol, "skipping blank seed entry");
                continue;
            };
            if policy == DuplicatePolicy::Reject && records.iter().any(|r| r.symbol == rec.symbol) {
                tracing::warn!(target: "watchlist", symbol = %rec.symbol, "skipping duplicate seed entry");
                continue;
            }
            records.push(rec);
        }
        Self::build(records, StdRng::from_os_rng(), policy)
    }

    /// Swap the duplicate policy (builder style).
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(records: Vec<SymbolRecord>, rng: StdRng, policy: DuplicatePolicy) -> Self {
        Self {
            inner: Mutex::new(Inner { records, rng }),
            policy,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("watchlist mutex poisoned")
    }
}

impl WatchlistStore for SimulatedWatchlist {
    fn list(&self) -> Vec<SymbolRecord> {
        self.lock().records.clone()
    }

    fn add(&self, symbol: &str, display_name: &str) -> Result<SymbolRecord, ValidationError> {
        let symbol = symbol.trim().to_uppercase();
        let display_name = display_name.trim();
        if symbol.is_empty() {
            return Err(ValidationError::BlankSymbol);
        }
        if display_name.is_empty() {
            return Err(ValidationError::BlankName);
        }

        let mut inner = self.lock();
        if self.policy == DuplicatePolicy::Reject && inner.records.iter().any(|r| r.symbol == symbol)
        {
            return Err(ValidationError::DuplicateSymbol(symbol));
        }

        let record = SymbolRecord {
            symbol,
            display_name: display_name.to_string(),
            price: draw_cents(&mut inner.rng, 50.0, 1050.0),
            absolute_change: draw_cents(&mut inner.rng, -10.0, 10.0),
            percent_change: draw_cents(&mut inner.rng, -3.0, 3.0),
        };
        inner.records.push(record.clone());
        tracing::debug!(target: "watchlist", symbol = %record.symbol, price = record.price, "added");
        Ok(record)
    }

    fn remove(&self, symbol: &str) -> bool {
        let mut inner = self.lock();
        match inner.records.iter().position(|r| r.symbol == symbol) {
            Some(idx) => {
                inner.records.remove(idx);
                tracing::debug!(target: "watchlist", %symbol, "removed");
                true
            }
            None => false,
        }
    }

    fn tick(&self) -> Vec<SymbolRecord> {
        let mut inner = self.lock();
        let Inner { records, rng } = &mut *inner;
        for r in records.iter_mut() {
            let delta = rng.random_range(-1.0..=1.0);
            drift(r, delta);
        }
        records.clone()
    }
}

/// Apply one price step. The change accumulates across ticks:
/// `abs' = new - old + abs`, `pct' = abs' / (new - abs') * 100`.
pub(crate) fn drift(r: &mut SymbolRecord, delta: f64) {
    let old = r.price;
    let new = (old + delta).max(MIN_PRICE);
    let abs = new - old + r.absolute_change;
    let base = new - abs;
    let pct = if base == 0.0 { 0.0 } else { abs / base * 100.0 };

    r.price = round2(new).max(MIN_PRICE);
    r.absolute_change = round2(abs);
    r.percent_change = round2(pct);
}

/// Uniform draw from `[lo, hi)` rounded to cents. Rounding up to `hi` is
/// pulled back one cent so the upper bound stays exclusive.
fn draw_cents(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    let v = round2(rng.random_range(lo..hi));
    if v >= hi {
        round2(hi - 0.01)
    } else {
        v
    }
}

fn normalize_record(mut r: SymbolRecord) -> Option<SymbolRecord> {
    r.symbol = r.symbol.trim().to_uppercase();
    r.display_name = r.display_name.trim().to_string();
    if r.symbol.is_empty() || r.display_name.is_empty() {
        return None;
    }
    if !r.price.is_finite() || r.price < MIN_PRICE {
        r.price = MIN_PRICE;
    }
    Some(r)
}
