//! HTTP and WebSocket front end of the exchange
//!
//! `Exchange` ties the matching engine, account balances, market data and
//! admin configuration together; `router` exposes it over axum.

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::exchange::Exchange;

pub use exchange::{Placement, PlaceOrderRequest, PlatformStats};

/// App state shared across handlers
pub struct AppState {
    pub exchange: Exchange,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(exchange: Exchange, config: AppConfig) -> Self {
        Self { exchange, config }
    }
}

/// API documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        api::stats::health,
        api::stats::stats,
        // Account routes
        api::account::create_account,
        api::account::get_account,
        api::account::get_balances,
        api::account::deposit,
        api::account::withdraw,
        // Market routes
        api::market::get_markets,
        api::market::get_order_book,
        api::market::get_ticker,
        api::market::get_all_tickers,
        api::market::get_recent_trades,
        // Order routes
        api::order::place_order,
        api::order::cancel_order,
        api::order::get_order,
        api::order::order_history,
        api::order::trade_history,
        // Admin routes
        api::admin::list_markets,
        api::admin::get_market,
        api::admin::create_market,
        api::admin::update_market,
        api::admin::delete_market,
        api::admin::set_kyc_status,
        api::admin::audit_logs,
        api::admin::assets::list,
        api::admin::assets::create,
        api::admin::assets::fetch,
        api::admin::assets::update,
        api::admin::assets::remove,
        api::admin::fee_configs::list,
        api::admin::fee_configs::create,
        api::admin::fee_configs::fetch,
        api::admin::fee_configs::update,
        api::admin::fee_configs::remove,
        api::admin::ads::list,
        api::admin::ads::create,
        api::admin::ads::fetch,
        api::admin::ads::update,
        api::admin::ads::remove,
        api::admin::insurance_plans::list,
        api::admin::insurance_plans::create,
        api::admin::insurance_plans::fetch,
        api::admin::insurance_plans::update,
        api::admin::insurance_plans::remove,
        api::admin::lucky_draws::list,
        api::admin::lucky_draws::create,
        api::admin::lucky_draws::fetch,
        api::admin::lucky_draws::update,
        api::admin::lucky_draws::remove,
    ),
    components(
        schemas(
            common::model::account::Account,
            common::model::account::Balance,
            common::model::account::KycStatus,
            common::model::order::Order,
            common::model::order::Side,
            common::model::order::OrderType,
            common::model::order::TimeInForce,
            common::model::order::Status,
            common::model::trade::Trade,
            common::model::market::Market,
            common::model::admin::Asset,
            common::model::admin::FeeConfig,
            common::model::admin::Ad,
            common::model::admin::InsurancePlan,
            common::model::admin::LuckyDraw,
            common::model::admin::DrawStatus,
            common::model::audit::AuditEntry,
            common::model::audit::AuditAction,
            market_data::MarketDepth,
            market_data::PriceLevel,
            market_data::Ticker,
            market_data::TradeMessage,
            market_data::MarketStats,
            exchange::PlaceOrderRequest,
            exchange::PlatformStats,
            api::account::FundsRequest,
            api::admin::KycRequest,
            api::stats::Health,
            api::response::PlaceOrderResponse,
            api::response::OrderResponse,
            api::response::OrderHistoryResponse,
            api::response::ListMetadata,
            error::ErrorResponse,
            error::ErrorInfo,
        )
    ),
    tags(
        (name = "system", description = "Health and platform statistics"),
        (name = "account", description = "Account and balance endpoints"),
        (name = "market", description = "Market data endpoints"),
        (name = "order", description = "Order placement, cancellation and history"),
        (name = "admin", description = "Admin console endpoints")
    ),
    info(
        title = "Exchange API",
        version = "1.0.0",
        description = "Spot exchange: accounts, order matching, market data and audited administration"
    )
)]
pub struct ApiDoc;

/// The full HTTP application: REST under `/api/v1`, WebSocket at `/ws`, and
/// the OpenAPI document with Swagger UI
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .nest("/api/v1", api::routes())
        .route("/ws", get(ws::ws_handler))
        .merge(swagger_ui)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
