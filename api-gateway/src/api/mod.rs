//! API handlers
//!
//! This module contains all the API endpoint handlers organized by resource.
//! Each handler follows a consistent pattern:
//! - Extract state, caller and parameters using Axum extractors
//! - Call the exchange
//! - Map the result to a standardized response format

pub mod account;
pub mod admin;
pub mod caller;
pub mod market;
pub mod order;
pub mod response;
pub mod stats;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::AppState;

pub use response::{ApiListResponse, ApiResponse};

/// Routes served under `/api/v1`
pub fn routes() -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/health", get(stats::health))
        .route("/stats", get(stats::stats))
        // Accounts
        .route("/accounts", post(account::create_account))
        .route("/accounts/:id", get(account::get_account))
        .route("/accounts/:id/balances", get(account::get_balances))
        .route("/accounts/:id/deposit", post(account::deposit))
        .route("/accounts/:id/withdraw", post(account::withdraw))
        // Market data
        .route("/markets", get(market::get_markets))
        .route("/markets/tickers", get(market::get_all_tickers))
        .route("/markets/:symbol/order-book", get(market::get_order_book))
        .route("/markets/:symbol/ticker", get(market::get_ticker))
        .route("/markets/:symbol/trades", get(market::get_recent_trades))
        // Orders
        .route("/orders", post(order::place_order).get(order::order_history))
        .route("/orders/:id", get(order::get_order).delete(order::cancel_order))
        .route("/trades", get(order::trade_history))
        // Admin
        .route(
            "/admin/markets",
            get(admin::list_markets).post(admin::create_market),
        )
        .route(
            "/admin/markets/:id",
            get(admin::get_market)
                .put(admin::update_market)
                .delete(admin::delete_market),
        )
        .route("/admin/accounts/:id/kyc", put(admin::set_kyc_status))
        .route("/admin/audit-logs", get(admin::audit_logs));

    let router = admin::assets::routes(router);
    let router = admin::fee_configs::routes(router);
    let router = admin::ads::routes(router);
    let router = admin::insurance_plans::routes(router);
    admin::lucky_draws::routes(router)
}
