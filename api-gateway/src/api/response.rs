//! Standardized API response formats
//!
//! Every successful body carries `success: true`. Single resources sit under
//! `data`, collections under `data` with a count in `meta`. The order
//! endpoints use their own flat bodies (`order`, `trades`, `orders`).

use std::fmt::Debug;

use axum::response::{IntoResponse, Response};
use axum::Json;
use common::model::order::Order;
use common::model::trade::Trade;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A standardized API response wrapper for single resource responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// The response data
    pub data: T,
}

/// A standardized API response wrapper for list/collection responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiListResponse<T> {
    pub success: bool,
    /// The list of items
    pub data: Vec<T>,
    pub meta: ListMetadata,
}

/// Additional metadata about a list response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMetadata {
    /// Number of items returned
    pub count: usize,
}

/// Body of a successful order placement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderResponse {
    pub success: bool,
    /// The order after matching
    pub order: Order,
    /// Trades the order produced, in execution order
    pub trades: Vec<Trade>,
}

/// Body of a single order (detail and cancellation)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

/// Body of an order history query
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderHistoryResponse {
    pub success: bool,
    /// Orders, newest first
    pub orders: Vec<Order>,
}

impl<T> ApiResponse<T> {
    /// Create a new API response
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

impl<T> ApiListResponse<T> {
    /// Create a new list response
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            success: true,
            data,
            meta: ListMetadata { count },
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize + Debug,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl<T> IntoResponse for ApiListResponse<T>
where
    T: Serialize + Debug,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

macro_rules! json_response {
    ($($ty:ty),*) => {
        $(impl IntoResponse for $ty {
            fn into_response(self) -> Response {
                Json(self).into_response()
            }
        })*
    };
}

json_response!(PlaceOrderResponse, OrderResponse, OrderHistoryResponse);
