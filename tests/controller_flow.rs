// tests/controller_flow.rs
//
// Controller behavior against the simulated store plus stub news sources.
// Timer tests run on a paused clock so they finish instantly.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::Notify;

use watchlist_news::config::{DuplicatePolicy, NewsConfig};
use watchlist_news::controller::notify::NotificationLevel;
use watchlist_news::{
    AddStockForm, ControllerSettings, DashboardController, FetchError, MockNewsGenerator,
    NewsArticle, NewsSource, SimulatedWatchlist, SymbolRecord, ValidationError, WatchlistStore,
};

// ---------- stubs ----------

struct FailingNews;

#[async_trait::async_trait]
impl NewsSource for FailingNews {
    async fn for_symbol(&self, _: &str, _: usize) -> Result<Vec<NewsArticle>, FetchError> {
        Err(FetchError::Unavailable)
    }
    async fn for_all_symbols(&self, _: &[String], _: usize) -> Result<Vec<NewsArticle>, FetchError> {
        Err(FetchError::Source {
            source_name: "failing".into(),
            reason: "offline".into(),
        })
    }
    async fn poll_for_new(
        &self,
        _: &HashSet<String>,
        _: &[String],
    ) -> Result<Vec<NewsArticle>, FetchError> {
        Err(FetchError::Unavailable)
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Holds each `for_symbol` call until the test releases that symbol, and
/// optionally every `for_all_symbols` call until `release_market`.
struct GatedNews {
    inner: MockNewsGenerator,
    gates: HashMap<String, Arc<Notify>>,
    market: Option<Arc<Notify>>,
}

impl GatedNews {
    fn new(symbols: &[&str]) -> Self {
        Self {
            inner: MockNewsGenerator::new(NewsConfig::instant()).with_seed(5),
            gates: symbols
                .iter()
                .map(|s| (s.to_string(), Arc::new(Notify::new())))
                .collect(),
            market: None,
        }
    }

    fn with_market_gate(mut self) -> Self {
        self.market = Some(Arc::new(Notify::new()));
        self
    }

    fn release(&self, symbol: &str) {
        self.gates[symbol].notify_one();
    }

    fn release_market(&self) {
        if let Some(gate) = &self.market {
            gate.notify_one();
        }
    }
}

#[async_trait::async_trait]
impl NewsSource for GatedNews {
    async fn for_symbol(&self, symbol: &str, count: usize) -> Result<Vec<NewsArticle>, FetchError> {
        if let Some(gate) = self.gates.get(symbol) {
            gate.notified().await;
        }
        self.inner.for_symbol(symbol, count).await
    }
    async fn for_all_symbols(
        &self,
        symbols: &[String],
        per_symbol: usize,
    ) -> Result<Vec<NewsArticle>, FetchError> {
        if let Some(gate) = &self.market {
            gate.notified().await;
        }
        self.inner.for_all_symbols(symbols, per_symbol).await
    }
    async fn poll_for_new(
        &self,
        existing: &HashSet<String>,
        symbols: &[String],
    ) -> Result<Vec<NewsArticle>, FetchError> {
        self.inner.poll_for_new(existing, symbols).await
    }
    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Counts calls to `add` so tests can prove the store was never reached.
struct CountingStore {
    inner: SimulatedWatchlist,
    adds: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: SimulatedWatchlist::with_seed(1),
            adds: AtomicUsize::new(0),
        }
    }
}

impl WatchlistStore for CountingStore {
    fn list(&self) -> Vec<SymbolRecord> {
        self.inner.list()
    }
    fn add(&self, symbol: &str, name: &str) -> Result<SymbolRecord, ValidationError> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add(symbol, name)
    }
    fn remove(&self, symbol: &str) -> bool {
        self.inner.remove(symbol)
    }
    fn tick(&self) -> Vec<SymbolRecord> {
        self.inner.tick()
    }
}

/// Sleeps between taking the tick snapshot and handing it back.
struct SlowTickStore {
    inner: SimulatedWatchlist,
    pause: Duration,
}

impl WatchlistStore for SlowTickStore {
    fn list(&self) -> Vec<SymbolRecord> {
        self.inner.list()
    }
    fn add(&self, symbol: &str, name: &str) -> Result<SymbolRecord, ValidationError> {
        self.inner.add(symbol, name)
    }
    fn remove(&self, symbol: &str) -> bool {
        self.inner.remove(symbol)
    }
    fn tick(&self) -> Vec<SymbolRecord> {
        let out = self.inner.tick();
        std::thread::sleep(self.pause);
        out
    }
}

// ---------- helpers ----------

fn rec(symbol: &str, price: f64) -> SymbolRecord {
    SymbolRecord {
        symbol: symbol.into(),
        display_name: format!("{symbol} Ltd"),
        price,
        absolute_change: 0.0,
        percent_change: 0.0,
    }
}

/// Instant mock news whose clock moves 1 ms per call, so every batch gets
/// a distinct id stamp.
fn stepping_news() -> MockNewsGenerator {
    let step = AtomicI64::new(0);
    let base = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
    MockNewsGenerator::new(NewsConfig::instant())
        .with_seed(7)
        .with_clock(move || base + chrono::Duration::milliseconds(step.fetch_add(1, Ordering::SeqCst)))
}

fn controller(store: Arc<dyn WatchlistStore>, news: Arc<dyn NewsSource>) -> Arc<DashboardController> {
    Arc::new(DashboardController::new(store, news, ControllerSettings::default()))
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

// ---------- tests ----------

#[tokio::test(start_paused = true)]
async fn add_select_then_remove_selected_resets_selection() {
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_seed(3)),
        Arc::new(MockNewsGenerator::new(NewsConfig::default()).with_seed(3)),
    );
    assert!(ctl.snapshot().stocks.is_empty());

    let added = ctl.submit_add(&AddStockForm::new("aapl", "Apple Inc.")).unwrap();
    assert_eq!(added.symbol, "AAPL");
    let snap = ctl.snapshot();
    assert_eq!(snap.stocks.len(), 1);
    assert_eq!(snap.stocks[0].symbol, "AAPL");
    assert_eq!(snap.notifications.last().unwrap().level, NotificationLevel::Success);

    let task = {
        let ctl = Arc::clone(&ctl);
        tokio::spawn(async move { ctl.select_symbol("AAPL").await })
    };
    wait_until(|| ctl.snapshot().is_loading_selected).await;
    assert_eq!(ctl.snapshot().selected_symbol.as_deref(), Some("AAPL"));

    let fetched = task.await.unwrap().unwrap();
    let snap = ctl.snapshot();
    assert!(!snap.is_loading_selected);
    assert_eq!(fetched.len(), 8);
    assert_eq!(snap.selected_symbol_news, fetched);

    assert!(ctl.remove_stock("AAPL"));
    let snap = ctl.snapshot();
    assert!(snap.stocks.is_empty());
    assert_eq!(snap.selected_symbol, None);
    assert!(snap.selected_symbol_news.is_empty());
}

#[tokio::test]
async fn removing_other_symbol_keeps_selection() {
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 10.0), rec("IDEA", 7.66)])),
        Arc::new(MockNewsGenerator::new(NewsConfig::instant())),
    );
    ctl.select_symbol("AAPL").await.unwrap();
    assert!(ctl.remove_stock("IDEA"));
    assert!(!ctl.remove_stock("IDEA"));
    let snap = ctl.snapshot();
    assert_eq!(snap.selected_symbol.as_deref(), Some("AAPL"));
    assert!(!snap.selected_symbol_news.is_empty());
    assert_eq!(snap.stocks.len(), 1);
}

#[tokio::test]
async fn blank_form_never_reaches_store() {
    let store = Arc::new(CountingStore::new());
    let ctl = controller(store.clone(), Arc::new(MockNewsGenerator::new(NewsConfig::instant())));
    let before = ctl.snapshot();

    assert_eq!(
        ctl.submit_add(&AddStockForm::new("AAPL", "   ")),
        Err(ValidationError::BlankName)
    );
    assert_eq!(
        ctl.submit_add(&AddStockForm::new("", "Apple")),
        Err(ValidationError::BlankSymbol)
    );

    assert_eq!(store.adds.load(Ordering::SeqCst), 0);
    assert_eq!(ctl.snapshot(), before);
}

#[tokio::test]
async fn store_rejection_surfaces_error_and_keeps_stocks() {
    let store = SimulatedWatchlist::with_seed(2).with_policy(DuplicatePolicy::Reject);
    let ctl = controller(Arc::new(store), Arc::new(MockNewsGenerator::new(NewsConfig::instant())));
    ctl.submit_add(&AddStockForm::new("IDEA", "Vodafone Idea")).unwrap();
    let stocks_before = ctl.snapshot().stocks;

    let err = ctl.submit_add(&AddStockForm::new("idea", "Again")).unwrap_err();
    assert_eq!(err, ValidationError::DuplicateSymbol("IDEA".into()));

    let snap = ctl.snapshot();
    assert_eq!(snap.stocks, stocks_before);
    let last = snap.notifications.last().unwrap();
    assert_eq!(last.level, NotificationLevel::Error);
    assert!(last.message.contains("IDEA"));
}

#[tokio::test]
async fn failed_fetches_clear_loading_and_notify() {
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 100.0)])),
        Arc::new(FailingNews),
    );

    assert!(ctl.select_symbol("AAPL").await.is_err());
    assert!(ctl.refresh_market_news().await.is_err());

    let snap = ctl.snapshot();
    assert!(!snap.is_loading_selected);
    assert!(!snap.is_loading_market);
    assert_eq!(snap.selected_symbol.as_deref(), Some("AAPL"));
    let msgs: Vec<_> = snap.notifications.iter().map(|n| n.message.as_str()).collect();
    assert_eq!(msgs, ["Failed to load news for AAPL", "Failed to load market news."]);

    // background poll failures stay silent
    assert_eq!(ctl.poll_market_news().await, 0);
    assert_eq!(ctl.snapshot().notifications.len(), 2);
}

#[tokio::test]
async fn overlapping_selections_last_response_wins() {
    let news = Arc::new(GatedNews::new(&["AAPL", "IDEA"]));
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 1.0), rec("IDEA", 2.0)])),
        news.clone(),
    );

    let first = {
        let ctl = Arc::clone(&ctl);
        tokio::spawn(async move { ctl.select_symbol("AAPL").await })
    };
    wait_until(|| ctl.snapshot().selected_symbol.as_deref() == Some("AAPL")).await;
    let second = {
        let ctl = Arc::clone(&ctl);
        tokio::spawn(async move { ctl.select_symbol("IDEA").await })
    };
    wait_until(|| ctl.snapshot().selected_symbol.as_deref() == Some("IDEA")).await;

    // newer request finishes first, stale one lands afterwards
    news.release("IDEA");
    second.await.unwrap().unwrap();
    news.release("AAPL");
    first.await.unwrap().unwrap();

    let snap = ctl.snapshot();
    assert_eq!(snap.selected_symbol.as_deref(), Some("IDEA"));
    assert!(snap
        .selected_symbol_news
        .iter()
        .all(|a| a.related_symbol.as_deref() == Some("AAPL")));
}

#[tokio::test]
async fn dismissing_notifications() {
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_seed(1)),
        Arc::new(MockNewsGenerator::new(NewsConfig::instant())),
    );
    ctl.submit_add(&AddStockForm::new("AAPL", "Apple")).unwrap();
    let id = ctl.snapshot().notifications[0].id;
    assert!(ctl.dismiss_notification(id));
    assert!(!ctl.dismiss_notification(id));
    assert!(ctl.snapshot().notifications.is_empty());
}

#[tokio::test(start_paused = true)]
async fn start_runs_ticks_and_polls_until_shutdown() {
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 180.0), rec("IDEA", 7.66)])),
        Arc::new(stepping_news()),
    );
    ctl.start();
    ctl.start(); // second call ignored
    assert!(ctl.is_running());

    tokio::time::sleep(Duration::from_millis(2_900)).await;
    let snap = ctl.snapshot();
    assert_eq!(snap.price_ticks, 0, "first tick comes one period after start");
    assert_eq!(snap.market_news.len(), 6, "initial market fetch: 2 symbols x 3");
    assert!(!snap.is_loading_market);

    tokio::time::sleep(Duration::from_millis(6_200)).await; // t = 9.1s
    let snap = ctl.snapshot();
    assert_eq!(snap.price_ticks, 3);
    assert!(snap.last_tick_at.is_some());
    assert_eq!(snap.stocks.len(), 2);

    let before_poll: Vec<String> = snap.market_news.iter().map(|a| a.id.clone()).collect();
    tokio::time::sleep(Duration::from_millis(1_000)).await; // t = 10.1s, poll fired
    let snap = ctl.snapshot();
    assert_eq!(snap.market_news.len(), 7);
    let after: Vec<String> = snap.market_news.iter().map(|a| a.id.clone()).collect();
    assert!(!before_poll.contains(&after[0]), "new article goes first");
    assert_eq!(&after[1..], &before_poll[..], "existing order untouched");

    ctl.shutdown();
    assert!(!ctl.is_running());
    let ticks = ctl.snapshot().price_ticks;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ctl.snapshot().price_ticks, ticks);
    assert_eq!(ctl.snapshot().market_news.len(), 7);
}

fn symbols(records: Vec<SymbolRecord>) -> Vec<String> {
    records.into_iter().map(|r| r.symbol).collect()
}

fn slow_tick_controller() -> (Arc<SlowTickStore>, Arc<DashboardController>) {
    let store = Arc::new(SlowTickStore {
        inner: SimulatedWatchlist::with_records(vec![rec("AAPL", 180.0)]),
        pause: Duration::from_millis(200),
    });
    let ctl = controller(store.clone(), Arc::new(MockNewsGenerator::new(NewsConfig::instant())));
    (store, ctl)
}

#[test]
fn tick_in_flight_cannot_resurrect_removed_stock() {
    let (store, ctl) = slow_tick_controller();
    let ticker = {
        let ctl = Arc::clone(&ctl);
        std::thread::spawn(move || ctl.tick_prices())
    };
    std::thread::sleep(Duration::from_millis(50));
    assert!(ctl.remove_stock("AAPL"));
    ticker.join().unwrap();

    assert_eq!(symbols(ctl.stocks()), symbols(store.list()));
    assert!(ctl.stocks().is_empty());
}

#[test]
fn tick_in_flight_cannot_hide_added_stock() {
    let (store, ctl) = slow_tick_controller();
    let ticker = {
        let ctl = Arc::clone(&ctl);
        std::thread::spawn(move || ctl.tick_prices())
    };
    std::thread::sleep(Duration::from_millis(50));
    ctl.submit_add(&AddStockForm::new("IDEA", "Vodafone Idea")).unwrap();
    ticker.join().unwrap();

    assert_eq!(symbols(ctl.stocks()), symbols(store.list()));
    assert_eq!(symbols(ctl.stocks()), ["AAPL", "IDEA"]);
}

#[tokio::test]
async fn market_loading_flag_spans_startup_and_refresh_fetches() {
    let news = Arc::new(GatedNews::new(&[]).with_market_gate());
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 1.0), rec("IDEA", 2.0)])),
        news.clone(),
    );

    ctl.start();
    wait_until(|| ctl.snapshot().is_loading_market).await;
    assert!(ctl.snapshot().market_news.is_empty());
    news.release_market();
    wait_until(|| !ctl.snapshot().is_loading_market).await;
    assert_eq!(ctl.snapshot().market_news.len(), 6);

    let refresh = {
        let ctl = Arc::clone(&ctl);
        tokio::spawn(async move { ctl.refresh_market_news().await })
    };
    wait_until(|| ctl.snapshot().is_loading_market).await;
    news.release_market();
    assert_eq!(refresh.await.unwrap().unwrap(), 6);
    assert!(!ctl.snapshot().is_loading_market);

    ctl.shutdown();
}

#[tokio::test]
async fn removal_during_symbol_fetch_drops_late_articles() {
    let news = Arc::new(GatedNews::new(&["AAPL"]));
    let ctl = controller(
        Arc::new(SimulatedWatchlist::with_records(vec![rec("AAPL", 1.0)])),
        news.clone(),
    );

    let pending = {
        let ctl = Arc::clone(&ctl);
        tokio::spawn(async move { ctl.select_symbol("AAPL").await })
    };
    wait_until(|| ctl.snapshot().is_loading_selected).await;
    assert!(ctl.remove_stock("AAPL"));
    news.release("AAPL");

    assert_eq!(pending.await.unwrap().unwrap().len(), 8);
    let snap = ctl.snapshot();
    assert_eq!(snap.selected_symbol, None);
    assert!(snap.selected_symbol_news.is_empty());
    assert!(!snap.is_loading_selected);
}
