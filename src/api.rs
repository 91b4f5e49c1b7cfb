// src/api.rs
//! JSON API over the dashboard controller. The browser renders from these
//! snapshots and posts user intents back.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::controller::{DashboardController, DashboardSnapshot};
use crate::error::{AppError, AppResult};
use crate::model::{AddStockForm, NewsArticle, SymbolRecord};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<DashboardController>,
}

impl AppState {
    pub fn new(controller: Arc<DashboardController>) -> Self {
        Self { controller }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/dashboard", get(dashboard))
        .route("/api/stocks", get(list_stocks).post(add_stock))
        .route("/api/stocks/{symbol}", delete(remove_stock))
        .route("/api/stocks/{symbol}/select", post(select_stock))
        .route("/api/news/selected", get(selected_news))
        .route("/api/news/market", get(market_news))
        .route("/api/news/market/refresh", post(refresh_market_news))
        .route("/api/notifications/{id}", delete(dismiss_notification))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct SelectedNewsOut {
    symbol: Option<String>,
    articles: Vec<NewsArticle>,
    is_loading: bool,
}

#[derive(Debug, Serialize)]
struct MarketNewsOut {
    articles: Vec<NewsArticle>,
    is_loading: bool,
}

async fn dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.controller.snapshot())
}

async fn list_stocks(State(state): State<AppState>) -> Json<Vec<SymbolRecord>> {
    Json(state.controller.stocks())
}

async fn add_stock(
    State(state): State<AppState>,
    Json(form): Json<AddStockForm>,
) -> AppResult<(StatusCode, Json<SymbolRecord>)> {
    let record = state.controller.submit_add(&form)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> AppResult<StatusCode> {
    if state.controller.remove_stock(&symbol) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{symbol} is not on the watchlist")))
    }
}

async fn select_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> AppResult<Json<SelectedNewsOut>> {
    if !state.controller.stocks().iter().any(|r| r.symbol == symbol) {
        return Err(AppError::NotFound(format!("{symbol} is not on the watchlist")));
    }
    let articles = state.controller.select_symbol(&symbol).await?;
    Ok(Json(SelectedNewsOut {
        symbol: Some(symbol),
        articles,
        is_loading: false,
    }))
}

async fn selected_news(State(state): State<AppState>) -> Json<SelectedNewsOut> {
    let snap = state.controller.snapshot();
    Json(SelectedNewsOut {
        symbol: snap.selected_symbol,
        articles: snap.selected_symbol_news,
        is_loading: snap.is_loading_selected,
    })
}

async fn market_news(State(state): State<AppState>) -> Json<MarketNewsOut> {
    let snap = state.controller.snapshot();
    Json(MarketNewsOut {
        articles: snap.market_news,
        is_loading: snap.is_loading_market,
    })
}

async fn refresh_market_news(State(state): State<AppState>) -> AppResult<Json<MarketNewsOut>> {
    state.controller.refresh_market_news().await?;
    let snap = state.controller.snapshot();
    Ok(Json(MarketNewsOut {
        articles: snap.market_news,
        is_loading: snap.is_loading_market,
    }))
}

async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<StatusCode> {
    if state.controller.dismiss_notification(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("notification {id}")))
    }
}
