//! # View Controller
//! Coordinates the two recurring tasks and user intents against the
//! watchlist store and the news source, and owns the renderable state.
//!
//! State lives behind a lock that is never held across an `.await`, so each
//! replacement is atomic for every reader. Fetches are not fenced: when two
//! selections overlap, whichever response lands last wins.
//!
//! Lock order is view state first, then the store. Anything that copies a
//! store snapshot into `stocks` holds the view guard across the store call,
//! so an older snapshot can never overwrite a newer one.

pub mod notify;
pub mod scheduler;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::error::{FetchError, ValidationError};
use crate::model::{AddStockForm, NewsArticle, SymbolRecord};
use crate::news::{prepend_unique, NewsSource};
use crate::watchlist::WatchlistStore;

use self::notify::{Notification, NotificationLog};
use self::scheduler::{spawn_recurring, PollingTasks};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dashboard_price_ticks_total", "Completed price tick passes.");
        describe_counter!("dashboard_news_polls_total", "Background news polls started.");
        describe_counter!(
            "dashboard_news_polled_articles_total",
            "Articles prepended to the market feed by background polls."
        );
        describe_counter!(
            "dashboard_news_fetch_failures_total",
            "Failed symbol or market news fetches."
        );
        describe_counter!("dashboard_stocks_added_total", "Stocks added to the watchlist.");
        describe_counter!("dashboard_stocks_removed_total", "Stocks removed from the watchlist.");
        describe_gauge!("dashboard_watchlist_size", "Records currently on the watchlist.");
    });
}

/// Timer periods and batch sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub tick_interval: Duration,
    pub news_poll_interval: Duration,
    pub selected_news_count: usize,
    pub market_news_per_symbol: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            news_poll_interval: Duration::from_secs(10),
            selected_news_count: 8,
            market_news_per_symbol: 3,
        }
    }
}

impl From<&DashboardConfig> for ControllerSettings {
    fn from(cfg: &DashboardConfig) -> Self {
        Self {
            tick_interval: cfg.tick_interval(),
            news_poll_interval: cfg.news_poll_interval(),
            selected_news_count: cfg.selected_news_count,
            market_news_per_symbol: cfg.market_news_per_symbol,
        }
    }
}

/// Read copy of everything the dashboard renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub stocks: Vec<SymbolRecord>,
    pub selected_symbol: Option<String>,
    pub selected_symbol_news: Vec<NewsArticle>,
    pub market_news: Vec<NewsArticle>,
    pub is_loading_selected: bool,
    pub is_loading_market: bool,
    pub notifications: Vec<Notification>,
    pub price_ticks: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct ViewState {
    stocks: Vec<SymbolRecord>,
    selected_symbol: Option<String>,
    selected_symbol_news: Vec<NewsArticle>,
    market_news: Vec<NewsArticle>,
    is_loading_selected: bool,
    is_loading_market: bool,
    notifications: NotificationLog,
    price_ticks: u64,
    last_tick_at: Option<DateTime<Utc>>,
}

pub struct DashboardController {
    store: Arc<dyn WatchlistStore>,
    news: Arc<dyn NewsSource>,
    settings: ControllerSettings,
    state: RwLock<ViewState>,
    tasks: Mutex<Option<PollingTasks>>,
}

impl DashboardController {
    pub fn new(
        store: Arc<dyn WatchlistStore>,
        news: Arc<dyn NewsSource>,
        settings: ControllerSettings,
    ) -> Self {
        ensure_metrics_described();
        let stocks = store.list();
        Self {
            store,
            news,
            settings,
            state: RwLock::new(ViewState {
                stocks,
                ..ViewState::default()
            }),
            tasks: Mutex::new(None),
        }
    }

    /// Take a fresh store snapshot, kick off the market-wide fetch, and
    /// start the price tick and news poll tasks. Must run inside a Tokio
    /// runtime. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().expect("tasks mutex poisoned");
        if tasks.is_some() {
            tracing::warn!(target: "controller", "start called twice; ignoring");
            return;
        }

        self.refresh_stocks();

        let ctl = Arc::clone(self);
        tokio::spawn(async move {
            let _ = ctl.refresh_market_news().await;
        });

        let weak = Arc::downgrade(self);
        let price_tick = spawn_recurring(
            "price-tick",
            self.settings.tick_interval,
            weak.clone(),
            |ctl: Arc<Self>| async move {
                ctl.tick_prices();
            },
        );
        let news_poll = spawn_recurring(
            "news-poll",
            self.settings.news_poll_interval,
            weak,
            |ctl: Arc<Self>| async move {
                ctl.poll_market_news().await;
            },
        );
        *tasks = Some(PollingTasks::new(price_tick, news_poll));

        tracing::info!(
            target: "controller",
            tick_ms = self.settings.tick_interval.as_millis() as u64,
            poll_ms = self.settings.news_poll_interval.as_millis() as u64,
            news_source = self.news.name(),
            "dashboard started"
        );
    }

    /// Cancel both recurring tasks. In-flight fetches still complete.
    /// Dropping the controller has the same effect.
    pub fn shutdown(&self) {
        if let Some(tasks) = self.tasks.lock().expect("tasks mutex poisoned").take() {
            tasks.shutdown();
            tracing::info!(target: "controller", "dashboard stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks
            .lock()
            .expect("tasks mutex poisoned")
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    // ---- recurring work ----

    /// One price tick: perturb the store and replace `stocks`.
    pub fn tick_prices(&self) -> usize {
        let mut st = self.write();
        let stocks = self.store.tick();
        let n = stocks.len();
        counter!("dashboard_price_ticks_total").increment(1);
        gauge!("dashboard_watchlist_size").set(n as f64);

        st.stocks = stocks;
        st.price_ticks += 1;
        st.last_tick_at = Some(Utc::now());
        tracing::trace!(target: "controller", records = n, tick = st.price_ticks, "prices ticked");
        n
    }

    /// One background poll. New articles go in front of the market feed,
    /// without re-sorting. Failures are swallowed. Returns the number added.
    pub async fn poll_market_news(&self) -> usize {
        let (known, symbols) = {
            let st = self.read();
            let known: HashSet<String> = st.market_news.iter().map(|a| a.id.clone()).collect();
            (known, symbols_of(&st.stocks))
        };
        counter!("dashboard_news_polls_total").increment(1);

        match self.news.poll_for_new(&known, &symbols).await {
            Ok(fresh) if fresh.is_empty() => 0,
            Ok(fresh) => {
                let mut st = self.write();
                let before = st.market_news.len();
                let merged = prepend_unique(fresh, &st.market_news);
                st.market_news = merged;
                let added = st.market_news.len() - before;
                counter!("dashboard_news_polled_articles_total").increment(added as u64);
                tracing::debug!(target: "controller", added, "market news polled");
                added
            }
            Err(e) => {
                tracing::debug!(target: "controller", error = %e, "news poll failed (ignored)");
                0
            }
        }
    }

    // ---- user intents ----

    /// Fetch market-wide news for every tracked symbol into `market_news`.
    pub async fn refresh_market_news(&self) -> Result<usize, FetchError> {
        let symbols = symbols_of(&self.store.list());
        self.write().is_loading_market = true;

        let res = self
            .news
            .for_all_symbols(&symbols, self.settings.market_news_per_symbol)
            .await;

        let mut st = self.write();
        st.is_loading_market = false;
        match res {
            Ok(articles) => {
                let n = articles.len();
                st.market_news = articles;
                tracing::info!(target: "controller", articles = n, "market news loaded");
                Ok(n)
            }
            Err(e) => {
                counter!("dashboard_news_fetch_failures_total").increment(1);
                tracing::warn!(target: "controller", error = %e, "market news fetch failed");
                st.notifications.error("Error", "Failed to load market news.");
                Err(e)
            }
        }
    }

    /// Select `symbol` and load its news into `selected_symbol_news`.
    /// Returns the articles this call fetched.
    pub async fn select_symbol(&self, symbol: &str) -> Result<Vec<NewsArticle>, FetchError> {
        {
            let mut st = self.write();
            st.selected_symbol = Some(symbol.to_string());
            st.is_loading_selected = true;
        }

        let res = self
            .news
            .for_symbol(symbol, self.settings.selected_news_count)
            .await;

        let mut st = self.write();
        st.is_loading_selected = false;
        match res {
            Ok(articles) => {
                if st.selected_symbol.is_some() {
                    st.selected_symbol_news = articles.clone();
                    tracing::debug!(target: "controller", %symbol, articles = articles.len(), "symbol news loaded");
                } else {
                    // selection was cleared by a remove while the fetch ran
                    tracing::debug!(target: "controller", %symbol, "selection gone; dropping symbol news");
                }
                Ok(articles)
            }
            Err(e) => {
                counter!("dashboard_news_fetch_failures_total").increment(1);
                tracing::warn!(target: "controller", %symbol, error = %e, "symbol news fetch failed");
                st.notifications
                    .error("Error", format!("Failed to load news for {symbol}"));
                Err(e)
            }
        }
    }

    /// Add a stock from the form. Blank input never reaches the store.
    pub fn submit_add(&self, form: &AddStockForm) -> Result<SymbolRecord, ValidationError> {
        form.validate()?;

        let mut st = self.write();
        match self.store.add(&form.symbol, &form.name) {
            Ok(record) => {
                counter!("dashboard_stocks_added_total").increment(1);
                let stocks = self.store.list();
                gauge!("dashboard_watchlist_size").set(stocks.len() as f64);
                st.stocks = stocks;
                st.notifications.success(
                    "Stock added",
                    format!("{} has been added to your watchlist", record.symbol),
                );
                tracing::info!(target: "controller", symbol = %record.symbol, "stock added");
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(target: "controller", error = %e, "add stock rejected");
                st.notifications.error("Could not add stock", e.to_string());
                Err(e)
            }
        }
    }

    /// Remove a stock; clears the selection if it pointed at that symbol.
    pub fn remove_stock(&self, symbol: &str) -> bool {
        let mut st = self.write();
        if !self.store.remove(symbol) {
            return false;
        }
        counter!("dashboard_stocks_removed_total").increment(1);
        let stocks = self.store.list();
        gauge!("dashboard_watchlist_size").set(stocks.len() as f64);

        st.stocks = stocks;
        if st.selected_symbol.as_deref() == Some(symbol) {
            st.selected_symbol = None;
            st.selected_symbol_news.clear();
        }
        tracing::info!(target: "controller", %symbol, "stock removed");
        true
    }

    pub fn dismiss_notification(&self, id: u64) -> bool {
        self.write().notifications.dismiss(id)
    }

    // ---- reads ----

    /// Re-read the store into `stocks`.
    pub fn refresh_stocks(&self) -> Vec<SymbolRecord> {
        let mut st = self.write();
        let stocks = self.store.list();
        gauge!("dashboard_watchlist_size").set(stocks.len() as f64);
        st.stocks = stocks.clone();
        stocks
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let st = self.read();
        DashboardSnapshot {
            stocks: st.stocks.clone(),
            selected_symbol: st.selected_symbol.clone(),
            selected_symbol_news: st.selected_symbol_news.clone(),
            market_news: st.market_news.clone(),
            is_loading_selected: st.is_loading_selected,
            is_loading_market: st.is_loading_market,
            notifications: st.notifications.snapshot(),
            price_ticks: st.price_ticks,
            last_tick_at: st.last_tick_at,
        }
    }

    pub fn stocks(&self) -> Vec<SymbolRecord> {
        self.read().stocks.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, ViewState> {
        self.state.read().expect("view state lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewState> {
        self.state.write().expect("view state lock poisoned")
    }
}

fn symbols_of(stocks: &[SymbolRecord]) -> Vec<String> {
    stocks.iter().map(|r| r.symbol.clone()).collect()
}
