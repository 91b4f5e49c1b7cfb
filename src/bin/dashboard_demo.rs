//! Headless demo: runs the controller against the simulated store and mock
//! news for a few seconds and logs what a browser would render.

use std::time::Duration;

use watchlist_news::{AddStockForm, DashboardConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut config = DashboardConfig::load_default()?;
    config.metrics_enabled = false;
    config.tick_interval_ms = 1_000;
    config.news_poll_interval_ms = 2_000;

    let dashboard = watchlist_news::build(&config)?;
    let ctl = dashboard.controller;
    ctl.start();

    if let Err(e) = ctl.submit_add(&AddStockForm::new("aapl", "Apple Inc.")) {
        tracing::warn!(error = %e, "demo add failed");
    }
    if ctl.select_symbol("AAPL").await.is_ok() {
        for a in ctl.snapshot().selected_symbol_news.iter().take(3) {
            println!("AAPL | {} | {} | {}", a.published_at.format("%Y-%m-%d %H:%M"), a.source, a.headline);
        }
    }

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let snap = ctl.snapshot();
        for s in &snap.stocks {
            println!(
                "{:<12} {:>10.2} {:>+8.2}%",
                s.symbol, s.price, s.percent_change
            );
        }
        println!(
            "-- tick {} | market news {} | notifications {}",
            snap.price_ticks,
            snap.market_news.len(),
            snap.notifications.len()
        );
    }

    ctl.remove_stock("AAPL");
    ctl.shutdown();
    println!("dashboard-demo done");
    Ok(())
}
