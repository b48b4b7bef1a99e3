// Shared setup for the HTTP contract tests: an in-process router with
// assets and markets listed through the admin API.

use std::str::FromStr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use exchange_core::account_service::AccountService;
use exchange_core::admin_service::AdminService;
use exchange_core::api_gateway::config::AppConfig;
use exchange_core::api_gateway::exchange::Exchange;
use exchange_core::api_gateway::{router, AppState};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    router: Router,
    pub admin: Uuid,
    pub fee_account: Uuid,
}

/// Status and parsed JSON body of one call
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Router with BTC and USDT listed and a BTC-USDT market open
    pub async fn new() -> Self {
        let admin = Uuid::new_v4();
        let mut config = AppConfig::default();
        config.admin_ids.insert(admin);

        let exchange = Exchange::new(
            Arc::new(AccountService::new()),
            Arc::new(AdminService::default()),
            &config,
        );
        exchange.start().await.unwrap();
        let fee_account = exchange.fee_account();

        let app = Self {
            router: router(Arc::new(AppState::new(exchange, config))),
            admin,
            fee_account,
        };

        for symbol in ["BTC", "USDT"] {
            let reply = app
                .call(Method::POST, "/api/v1/admin/assets", Some(admin), Some(json!({
                    "symbol": symbol,
                    "name": symbol,
                    "withdraw_fee": "0.01"
                })))
                .await;
            assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        }
        let reply = app
            .call(Method::POST, "/api/v1/admin/markets", Some(admin), Some(json!({
                "symbol": "BTC-USDT",
                "base_asset": "BTC",
                "quote_asset": "USDT",
                "price_tick": "0.01",
                "quantity_step": "0.001"
            })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

        app
    }

    pub async fn call(&self, method: Method, uri: &str, caller: Option<Uuid>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            request = request.header("x-user-id", caller.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply { status, body }
    }

    /// New account funded with the given amounts
    pub async fn funded_account(&self, funds: &[(&str, &str)]) -> Uuid {
        let reply = self.call(Method::POST, "/api/v1/accounts", None, None).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let id = Uuid::parse_str(reply.body["data"]["id"].as_str().unwrap()).unwrap();

        for (asset, amount) in funds {
            let reply = self
                .call(
                    Method::POST,
                    &format!("/api/v1/accounts/{}/deposit", id),
                    Some(id),
                    Some(json!({ "asset": asset, "amount": amount })),
                )
                .await;
            assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        }
        id
    }

    pub async fn place(&self, user: Uuid, order: Value) -> Reply {
        self.call(Method::POST, "/api/v1/orders", Some(user), Some(order)).await
    }

    pub async fn limit(&self, user: Uuid, side: &str, price: &str, quantity: &str) -> Reply {
        self.place(user, json!({
            "symbol": "BTC-USDT",
            "side": side,
            "type": "limit",
            "price": price,
            "quantity": quantity
        }))
        .await
    }

    /// (total, available, locked) of one asset, zero when the account never held it
    pub async fn balance(&self, account: Uuid, asset: &str) -> (Decimal, Decimal, Decimal) {
        let reply = self
            .call(Method::GET, &format!("/api/v1/accounts/{}/balances", account), Some(self.admin), None)
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|balance| balance["asset"] == asset)
            .map(|balance| (number(&balance["total"]), number(&balance["available"]), number(&balance["locked"])))
            .unwrap_or_default()
    }
}

/// Decimal from a JSON string or number
pub fn number(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}
