//! Market data API handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use common::model::market::Market;
use market_data::{MarketDepth, Ticker, TradeMessage};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::response::{ApiListResponse, ApiResponse};
use crate::error::ApiResult;
use crate::AppState;

const DEFAULT_DEPTH: usize = 20;
const DEFAULT_TRADES: usize = 50;

/// Get all markets
#[utoipa::path(
    get,
    path = "/api/v1/markets",
    responses(
        (status = 200, description = "List of available markets retrieved successfully", body = [Market])
    ),
    tag = "market"
)]
pub async fn get_markets(State(state): State<Arc<AppState>>) -> ApiResult<ApiListResponse<Market>> {
    Ok(ApiListResponse::new(state.exchange.markets()))
}

/// Order book query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct DepthQuery {
    /// Levels per side
    pub depth: Option<usize>,
}

/// Get the order book of a market
#[utoipa::path(
    get,
    path = "/api/v1/markets/{symbol}/order-book",
    params(
        ("symbol" = String, Path, description = "Market symbol"),
        DepthQuery
    ),
    responses(
        (status = 200, description = "Order book retrieved successfully", body = MarketDepth),
        (status = 404, description = "Market not found")
    ),
    tag = "market"
)]
pub async fn get_order_book(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<DepthQuery>,
) -> ApiResult<ApiResponse<MarketDepth>> {
    let depth = query.depth.unwrap_or(DEFAULT_DEPTH);
    Ok(ApiResponse::new(state.exchange.market_depth(&symbol, depth)?))
}

/// Get the ticker of a market
#[utoipa::path(
    get,
    path = "/api/v1/markets/{symbol}/ticker",
    params(
        ("symbol" = String, Path, description = "Market symbol")
    ),
    responses(
        (status = 200, description = "Ticker retrieved successfully", body = Ticker),
        (status = 404, description = "Market not found")
    ),
    tag = "market"
)]
pub async fn get_ticker(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<ApiResponse<Ticker>> {
    Ok(ApiResponse::new(state.exchange.ticker(&symbol)?))
}

/// Get tickers for all markets
#[utoipa::path(
    get,
    path = "/api/v1/markets/tickers",
    responses(
        (status = 200, description = "All tickers retrieved successfully", body = [Ticker])
    ),
    tag = "market"
)]
pub async fn get_all_tickers(State(state): State<Arc<AppState>>) -> ApiResult<ApiListResponse<Ticker>> {
    Ok(ApiListResponse::new(state.exchange.tickers()))
}

/// Recent trades query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentTradesQuery {
    /// Maximum number of trades
    pub limit: Option<usize>,
}

/// Get the most recent trades of a market
#[utoipa::path(
    get,
    path = "/api/v1/markets/{symbol}/trades",
    params(
        ("symbol" = String, Path, description = "Market symbol"),
        RecentTradesQuery
    ),
    responses(
        (status = 200, description = "Recent trades, newest first", body = [TradeMessage]),
        (status = 404, description = "Market not found")
    ),
    tag = "market"
)]
pub async fn get_recent_trades(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<RecentTradesQuery>,
) -> ApiResult<ApiListResponse<TradeMessage>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRADES);
    Ok(ApiListResponse::new(state.exchange.recent_trades(&symbol, limit)?))
}
