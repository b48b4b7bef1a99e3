//! The exchange: order flow across the matching engine, account balances,
//! market data and the admin-managed configuration.
//!
//! Funds move in a fixed sequence for every order. The reservation is taken
//! from `available` before the engine sees the order, every trade is settled
//! out of the reservations of both sides, and whatever the taker no longer
//! needs is released. A rejected order gets its whole reservation back.

use std::sync::Arc;

use account_service::AccountService;
use admin_service::AdminService;
use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::error::{Error, ErrorExt, Result};
use common::model::account::{Account, Balance, KycStatus};
use common::model::admin::Asset;
use common::model::audit::{AuditAction, AuditEntry};
use common::model::market::{order_value, Market};
use common::model::order::{Order, OrderType, Side, TimeInForce};
use common::model::trade::{FeeRates, Trade};
use market_data::{MarketDataService, MarketDepth, MarketStats, Ticker, TradeMessage};
use matching_engine::{BookSnapshot, MatchingEngine, OrderFilter};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;

/// Order placement request. Every field is optional on the wire so that a
/// missing field is reported as a validation error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    /// Market symbol, e.g. "BTC-USDT"
    pub symbol: Option<String>,
    pub side: Option<Side>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub quantity: Option<Quantity>,
    /// Required for limit orders
    pub price: Option<Price>,
    /// Defaults to GTC for limit orders; market orders never rest
    pub time_in_force: Option<TimeInForce>,
}

/// An accepted order and the trades it produced
#[derive(Debug, Clone)]
pub struct Placement {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Platform-wide counters for dashboards
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformStats {
    pub markets: usize,
    pub accounts: usize,
    pub total_orders: usize,
    pub open_orders: usize,
    pub total_trades: usize,
    /// 24h statistics per market
    pub market_stats: Vec<MarketStats>,
    pub timestamp: DateTime<Utc>,
}

pub struct Exchange {
    engine: Arc<MatchingEngine>,
    accounts: Arc<AccountService>,
    market_data: Arc<MarketDataService>,
    admin: Arc<AdminService>,
    fee_account: Uuid,
}

fn missing(field: &str) -> Error {
    Error::ValidationError(format!("Missing required field: {}", field))
}

impl Exchange {
    pub fn new(accounts: Arc<AccountService>, admin: Arc<AdminService>, config: &AppConfig) -> Self {
        Self {
            engine: Arc::new(MatchingEngine::with_snapshot_depth(config.order_book_depth)),
            accounts,
            market_data: Arc::new(MarketDataService::new()),
            admin,
            fee_account: config.fee_account_id,
        }
    }

    /// Make sure the fee account exists and every configured market has a book.
    /// Books start empty, so reservations held over from a previous run are released.
    pub async fn start(&self) -> Result<()> {
        self.accounts.release_all_reservations().await?;
        self.accounts
            .ensure_account(self.fee_account)
            .await
            .with_context(|| format!("Failed to open fee account {}", self.fee_account))?;

        for market in self.admin.list::<Market>() {
            self.open_market(&market.symbol);
        }
        info!("Exchange started with {} markets", self.engine.markets().len());
        Ok(())
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn market_data(&self) -> &MarketDataService {
        &self.market_data
    }

    pub fn admin(&self) -> &AdminService {
        &self.admin
    }

    pub fn fee_account(&self) -> Uuid {
        self.fee_account
    }

    fn open_market(&self, symbol: &str) {
        self.engine.register_market(symbol.to_string());
        self.market_data.register_market(symbol);
    }

    /// The configured market with this symbol
    pub fn market(&self, symbol: &str) -> Result<Market> {
        self.admin
            .market_by_symbol(symbol)
            .ok_or_else(|| Error::MarketNotFound(format!("Market not found: {}", symbol)))
    }

    fn fee_rates(&self, symbol: &str) -> FeeRates {
        self.admin
            .fee_config_for(symbol)
            .map(|config| FeeRates {
                maker: config.maker_fee_rate,
                taker: config.taker_fee_rate,
            })
            .unwrap_or_default()
    }

    fn listed_asset(&self, symbol: &str) -> Result<Asset> {
        self.admin
            .asset_by_symbol(symbol)
            .ok_or_else(|| Error::ValidationError(format!("Asset is not listed: {}", symbol)))
    }

    // Orders

    /// Validate, reserve, match, settle and publish one order
    pub async fn place_order(&self, user_id: Uuid, request: PlaceOrderRequest) -> Result<Placement> {
        let symbol = request
            .symbol
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("symbol"))?;
        let side = request.side.ok_or_else(|| missing("side"))?;
        let order_type = request.order_type.ok_or_else(|| missing("type"))?;
        let quantity = request.quantity.ok_or_else(|| missing("quantity"))?;
        if quantity <= Quantity::ZERO {
            return Err(Error::ValidationError(format!("Quantity must be positive, got {}", quantity)));
        }

        let market = self.market(&symbol)?;
        if !market.trading_enabled {
            return Err(Error::ValidationError(format!("Trading is disabled on {}", symbol)));
        }

        let mut order = match order_type {
            OrderType::Limit => {
                let price = request
                    .price
                    .ok_or_else(|| Error::ValidationError("Limit orders require a price".to_string()))?;
                if price <= Price::ZERO {
                    return Err(Error::ValidationError(format!("Price must be positive, got {}", price)));
                }
                let tif = request.time_in_force.unwrap_or(TimeInForce::GTC);
                Order::new_limit(user_id, symbol, side, price, quantity, tif)
            }
            OrderType::Market => {
                let mut order = Order::new_market(user_id, symbol, side, quantity);
                if request.time_in_force == Some(TimeInForce::FOK) {
                    order.time_in_force = TimeInForce::FOK;
                }
                order
            }
        };
        market.check_order(order.price, quantity)?;

        let reservation = match (side, order.price) {
            (Side::Buy, Some(price)) => order_value(price, quantity)?,
            (Side::Buy, None) => self
                .engine
                .estimate_market_buy_cost(&order.symbol, quantity)?
                .ok_or_else(|| {
                    Error::ValidationError("Cannot execute market buy order, no liquidity".to_string())
                })?,
            (Side::Sell, _) => quantity,
        };
        let asset = market.locked_asset(side).to_string();

        self.accounts.reserve(user_id, &asset, reservation).await?;
        order.locked_amount = reservation;
        debug!("Reserved {} {} for order {}", reservation, asset, order.id);

        let result = match self.engine.place_order_with_fees(order, &self.fee_rates(&market.symbol)) {
            Ok(result) => result,
            Err(e) => {
                if let Err(release_error) = self.accounts.release(user_id, &asset, reservation).await {
                    error!(
                        "Failed to release {} {} for {} after rejected order: {}",
                        reservation, asset, user_id, release_error
                    );
                }
                return Err(e);
            }
        };

        // The engine has committed the fills; settle all of them even if one fails
        let mut failure = None;
        for trade in &result.trades {
            if let Err(e) = self.accounts.settle_trade(trade, &market, self.fee_account).await {
                error!("Failed to settle trade {}: {}", trade.id, e);
                failure.get_or_insert(e);
            }
        }
        if let Err(e) = self.accounts.release(user_id, &asset, result.taker_release).await {
            error!("Failed to release {} {} for {}: {}", result.taker_release, asset, user_id, e);
            failure.get_or_insert(e);
        }

        self.publish(&market.symbol, &result.trades, result.book);

        if let Some(e) = failure {
            return Err::<Placement, _>(e)
                .with_context(|| format!("Order {} matched but settlement failed", result.taker_order.id));
        }

        info!(
            "Order {} placed: {:?}, {} trades",
            result.taker_order.id,
            result.taker_order.status,
            result.trades.len()
        );
        Ok(Placement {
            order: result.taker_order,
            trades: result.trades,
        })
    }

    /// Cancel an open order of `user_id` and release what it still holds
    pub async fn cancel_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let cancellation = self.engine.cancel_order(order_id, user_id)?;
        let order = cancellation.order;

        let market = self.market(&order.symbol)?;
        self.accounts
            .release(user_id, market.locked_asset(order.side), cancellation.unlocked)
            .await
            .with_context(|| format!("Failed to release funds of cancelled order {}", order.id))?;

        self.publish(&order.symbol, &[], cancellation.book);
        Ok(order)
    }

    /// One order of `user_id`
    pub fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
        let order = self
            .engine
            .get_order(order_id)
            .ok_or_else(|| Error::OrderNotFound(format!("Order not found: {}", order_id)))?;
        if order.user_id != user_id {
            return Err(Error::AuthorizationError(format!(
                "Order {} does not belong to {}", order_id, user_id
            )));
        }
        Ok(order)
    }

    /// Orders of `user_id`, newest first
    pub fn order_history(&self, user_id: Uuid, filter: &OrderFilter) -> Vec<Order> {
        self.engine.orders_for_user(user_id, filter)
    }

    /// Trades `user_id` took part in, newest first
    pub fn trade_history(&self, user_id: Uuid, symbol: Option<&str>, limit: usize) -> Result<Vec<Trade>> {
        self.engine.trades_for_user(user_id, symbol, limit)
    }

    /// Push trades and the book they left behind to the market data read model
    fn publish(&self, symbol: &str, trades: &[Trade], book: BookSnapshot) {
        for trade in trades {
            self.market_data.process_trade(trade);
        }
        self.market_data
            .apply_book_snapshot(symbol, book.sequence, book.bids, book.asks);
    }

    // Accounts

    pub async fn create_account(&self) -> Result<Account> {
        self.accounts.create_account().await
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account> {
        self.accounts
            .get_account(account_id)
            .await?
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", account_id)))
    }

    pub async fn balances(&self, account_id: Uuid) -> Result<Vec<Balance>> {
        self.accounts.get_balances(account_id).await
    }

    /// Credit a listed asset with deposits enabled
    pub async fn deposit(&self, account_id: Uuid, asset: &str, amount: Amount) -> Result<Balance> {
        let listed = self.listed_asset(asset)?;
        if !listed.deposit_enabled {
            return Err(Error::ValidationError(format!("Deposits of {} are disabled", asset)));
        }
        self.accounts.deposit(account_id, asset, amount).await
    }

    /// Withdraw a listed asset; its withdrawal fee goes to the fee account
    pub async fn withdraw(&self, account_id: Uuid, asset: &str, amount: Amount) -> Result<Balance> {
        let listed = self.listed_asset(asset)?;
        if !listed.withdraw_enabled {
            return Err(Error::ValidationError(format!("Withdrawals of {} are disabled", asset)));
        }
        self.accounts
            .withdraw(account_id, asset, amount, listed.withdraw_fee, self.fee_account)
            .await
    }

    /// Change an account's KYC status, recorded in the audit log
    pub async fn set_kyc_status(&self, actor_id: Uuid, account_id: Uuid, status: KycStatus) -> Result<Account> {
        let before = self.get_account(account_id).await?;
        let after = self.accounts.set_kyc_status(account_id, status).await?;

        let entry = AuditEntry::new(
            actor_id,
            AuditAction::Update,
            "account",
            account_id.to_string(),
            Some(serde_json::to_value(&before)?),
            Some(serde_json::to_value(&after)?),
        );
        if let Err(e) = self.admin.record(entry).await {
            error!("Audit write failed, restoring KYC status of {}: {}", account_id, e);
            self.accounts.set_kyc_status(account_id, before.kyc_status).await?;
            return Err(e);
        }
        Ok(after)
    }

    // Markets

    pub fn markets(&self) -> Vec<Market> {
        self.admin.list::<Market>()
    }

    /// List a market and open its book
    pub async fn create_market(&self, actor_id: Uuid, market: Market) -> Result<Market> {
        let created = self.admin.create(actor_id, market).await?;
        self.open_market(&created.symbol);
        Ok(created)
    }

    /// Change a market's trading parameters; the symbol is fixed
    pub async fn update_market(&self, actor_id: Uuid, id: Uuid, market: Market) -> Result<Market> {
        self.admin.update(actor_id, id, market).await
    }

    /// Delist a market. Fails while orders rest on its book.
    pub async fn delete_market(&self, actor_id: Uuid, id: Uuid) -> Result<Market> {
        let market = self.admin.get::<Market>(id)?;
        self.engine.unregister_market(&market.symbol)?;

        match self.admin.delete::<Market>(actor_id, id).await {
            Ok(deleted) => {
                self.market_data.remove_market(&deleted.symbol);
                Ok(deleted)
            }
            Err(e) => {
                self.engine.register_market(market.symbol);
                Err(e)
            }
        }
    }

    // Market data

    pub fn market_depth(&self, symbol: &str, limit: usize) -> Result<MarketDepth> {
        self.market(symbol)?;
        Ok(self
            .market_data
            .get_market_depth(symbol, limit)
            .unwrap_or_else(|| MarketDepth::empty(symbol)))
    }

    pub fn ticker(&self, symbol: &str) -> Result<Ticker> {
        self.market(symbol)?;
        Ok(self
            .market_data
            .get_ticker(symbol)
            .unwrap_or_else(|| Ticker::empty(symbol)))
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        self.market_data.get_all_tickers()
    }

    pub fn recent_trades(&self, symbol: &str, limit: usize) -> Result<Vec<TradeMessage>> {
        self.market(symbol)?;
        Ok(self.market_data.get_recent_trades(symbol, limit))
    }

    pub async fn stats(&self) -> Result<PlatformStats> {
        let markets = self.markets();
        let market_stats = markets
            .iter()
            .filter_map(|market| self.market_data.market_stats(&market.symbol))
            .collect();

        Ok(PlatformStats {
            markets: markets.len(),
            accounts: self.accounts.account_count().await?,
            total_orders: self.engine.order_count(),
            open_orders: self.engine.open_order_count(None)?,
            total_trades: self.engine.trade_count()?,
            market_stats,
            timestamp: Utc::now(),
        })
    }
}
