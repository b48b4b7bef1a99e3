//! Order API handlers
//!
//! Handlers for order management endpoints including:
//! - Place new orders
//! - Cancel existing orders
//! - Get order details
//! - List the caller's orders and trades

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use common::model::order::Status;
use common::model::trade::Trade;
use matching_engine::{OrderFilter, OrderScope};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::api::caller::{ApiJson, Caller};
use crate::api::response::{
    ApiListResponse, OrderHistoryResponse, OrderResponse, PlaceOrderResponse,
};
use crate::error::ApiResult;
use crate::exchange::PlaceOrderRequest;
use crate::AppState;

const DEFAULT_TRADE_LIMIT: usize = 100;

/// Place a new order
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    params(("x-user-id" = Uuid, Header, description = "Caller account ID")),
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed successfully", body = PlaceOrderResponse),
        (status = 400, description = "Invalid order or insufficient balance", body = ErrorResponse),
        (status = 401, description = "Missing caller", body = ErrorResponse),
        (status = 404, description = "Market not found", body = ErrorResponse)
    ),
    tag = "order"
)]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    ApiJson(request): ApiJson<PlaceOrderRequest>,
) -> ApiResult<PlaceOrderResponse> {
    let placement = state.exchange.place_order(user_id, request).await?;
    Ok(PlaceOrderResponse {
        success: true,
        order: placement.order,
        trades: placement.trades,
    })
}

/// Cancel an order
#[utoipa::path(
    delete,
    path = "/api/v1/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID to cancel"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Order cancelled successfully", body = OrderResponse),
        (status = 400, description = "Order is no longer open", body = ErrorResponse),
        (status = 403, description = "Order belongs to another account", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "order"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    tracing::info!("Cancelling order {} for {}", id, user_id);
    let order = state.exchange.cancel_order(user_id, id).await?;
    Ok(OrderResponse { success: true, order })
}

/// Get an order by ID
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Order retrieved successfully", body = OrderResponse),
        (status = 403, description = "Order belongs to another account", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    ),
    tag = "order"
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.exchange.get_order(user_id, id)?;
    Ok(OrderResponse { success: true, order })
}

/// Order history query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderHistoryQuery {
    /// `open`, `closed` or `all` (default)
    #[serde(rename = "type")]
    #[param(value_type = Option<String>)]
    pub scope: Option<OrderScope>,
    /// Only orders of this market
    pub symbol: Option<String>,
    /// Only orders in this status
    #[param(value_type = Option<String>)]
    pub status: Option<Status>,
}

/// List the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        OrderHistoryQuery,
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Orders retrieved successfully", body = OrderHistoryResponse),
        (status = 401, description = "Missing caller", body = ErrorResponse)
    ),
    tag = "order"
)]
pub async fn order_history(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Query(query): Query<OrderHistoryQuery>,
) -> ApiResult<OrderHistoryResponse> {
    let filter = OrderFilter {
        scope: query.scope.unwrap_or_default(),
        symbol: query.symbol,
        status: query.status,
    };
    Ok(OrderHistoryResponse {
        success: true,
        orders: state.exchange.order_history(user_id, &filter),
    })
}

/// Trade history query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct TradeHistoryQuery {
    /// Only trades of this market
    pub symbol: Option<String>,
    /// Maximum number of trades
    pub limit: Option<usize>,
}

/// List trades the caller took part in, newest first
#[utoipa::path(
    get,
    path = "/api/v1/trades",
    params(
        TradeHistoryQuery,
        ("x-user-id" = Uuid, Header, description = "Caller account ID")
    ),
    responses(
        (status = 200, description = "Trades retrieved successfully", body = [Trade]),
        (status = 401, description = "Missing caller", body = ErrorResponse)
    ),
    tag = "order"
)]
pub async fn trade_history(
    State(state): State<Arc<AppState>>,
    Caller(user_id): Caller,
    Query(query): Query<TradeHistoryQuery>,
) -> ApiResult<ApiListResponse<Trade>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRADE_LIMIT);
    let trades = state.exchange.trade_history(user_id, query.symbol.as_deref(), limit)?;
    Ok(ApiListResponse::new(trades))
}
