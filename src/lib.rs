// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod model;
pub mod news;
pub mod watchlist;

use std::sync::Arc;

use axum::Router;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::DashboardConfig;
pub use crate::controller::{ControllerSettings, DashboardController, DashboardSnapshot};
pub use crate::error::{AppError, FetchError, ValidationError};
pub use crate::model::{AddStockForm, NewsArticle, SymbolRecord};
pub use crate::news::{MockNewsGenerator, NewsSource};
pub use crate::watchlist::{SimulatedWatchlist, WatchlistStore};

/// A wired dashboard: the controller (not yet started) and its HTTP router.
pub struct Dashboard {
    pub controller: Arc<DashboardController>,
    pub router: Router,
}

/// Build the simulated store, mock news source, controller and router from
/// config. Call `controller.start()` from inside the runtime to begin
/// ticking and polling.
pub fn build(config: &DashboardConfig) -> anyhow::Result<Dashboard> {
    // recorder first, so metric descriptions land in it
    let metrics = if config.metrics_enabled {
        Some(metrics::Metrics::init()?)
    } else {
        None
    };

    let store = Arc::new(SimulatedWatchlist::from_seeds(
        &config.watchlist,
        config.duplicate_policy,
    ));
    if store.is_empty() {
        tracing::warn!(target: "dashboard", "starting with an empty watchlist");
    }
    let seeded = store.len();
    let news = Arc::new(MockNewsGenerator::new(config.news.clone()));
    let controller = Arc::new(DashboardController::new(
        store,
        news,
        ControllerSettings::from(config),
    ));

    let mut router = api::router(api::AppState::new(Arc::clone(&controller)));
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }

    tracing::info!(
        target: "dashboard",
        seeded,
        metrics = config.metrics_enabled,
        "dashboard built"
    );
    Ok(Dashboard { controller, router })
}
