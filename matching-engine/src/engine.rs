use std::sync::{Arc, RwLock};

use chrono::Utc;
use common::decimal::{precision, Amount, Price, Quantity};
use common::error::{Error, Result};
use common::model::order::{Order, OrderType, Side, Status, TimeInForce};
use common::model::trade::{FeeRates, Trade};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::order_book::{BookSnapshot, OrderBook};

/// Levels per side in change snapshots unless configured otherwise
pub const DEFAULT_SNAPSHOT_DEPTH: usize = 20;

/// Result of a matching operation
#[derive(Debug)]
pub struct MatchingResult {
    /// The taker order after matching
    pub taker_order: Order,
    /// Snapshots of the maker orders touched, after their fills
    pub maker_orders: Vec<Order>,
    /// Trades that were generated, in execution order
    pub trades: Vec<Trade>,
    /// Part of the taker's reservation it no longer needs (unfilled market/IOC
    /// remainder, or price improvement on a limit buy)
    pub taker_release: Amount,
    /// The book right after this order, taken under the book lock
    pub book: BookSnapshot,
}

/// Result of cancelling a resting order
#[derive(Debug)]
pub struct Cancellation {
    /// The order, now cancelled
    pub order: Order,
    /// Funds that were reserved for the remainder and can be unlocked
    pub unlocked: Amount,
    /// The book right after the cancellation
    pub book: BookSnapshot,
}

/// Which orders an order history query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderScope {
    /// Pending and partially filled orders
    Open,
    /// Filled, cancelled and rejected orders
    Closed,
    #[default]
    All,
}

/// Order history filter
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub scope: OrderScope,
    pub symbol: Option<String>,
    pub status: Option<Status>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        let in_scope = match self.scope {
            OrderScope::Open => order.is_active(),
            OrderScope::Closed => !order.is_active(),
            OrderScope::All => true,
        };
        in_scope
            && self.symbol.as_deref().map_or(true, |s| s == order.symbol)
            && self.status.map_or(true, |s| s == order.status)
    }
}

/// Top of book for one market
#[derive(Debug, Clone, Default)]
pub struct BookTop {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub last_price: Option<Price>,
    pub open_orders: usize,
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("order book lock poisoned".to_string())
}

/// The matching engine responsible for processing orders and generating trades
pub struct MatchingEngine {
    /// Map of market symbols to order books
    order_books: DashMap<String, Arc<RwLock<OrderBook>>>,
    /// Every order ever accepted, by ID
    orders: DashMap<Uuid, Order>,
    /// Executed trades in execution order
    trades: RwLock<Vec<Trade>>,
    /// Levels per side in the snapshots returned with each change
    snapshot_depth: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Create a new matching engine
    pub fn new() -> Self {
        Self {
            order_books: DashMap::new(),
            orders: DashMap::new(),
            trades: RwLock::new(Vec::new()),
            snapshot_depth: DEFAULT_SNAPSHOT_DEPTH,
        }
    }

    /// Engine whose change snapshots carry `depth` levels per side
    pub fn with_snapshot_depth(depth: usize) -> Self {
        Self {
            snapshot_depth: depth,
            ..Self::new()
        }
    }

    /// Register a new market. Registering an existing market keeps its book.
    pub fn register_market(&self, symbol: String) {
        if self.order_books.contains_key(&symbol) {
            debug!("Market already registered: {}", symbol);
            return;
        }
        info!("Registering market: {}", symbol);
        self.order_books
            .insert(symbol.clone(), Arc::new(RwLock::new(OrderBook::new(symbol))));
    }

    /// Remove a market; fails while orders are still resting on its book
    pub fn unregister_market(&self, symbol: &str) -> Result<()> {
        let book = self.book(symbol)?;
        let open_orders = book.read().map_err(poisoned)?.order_count();
        if open_orders > 0 {
            return Err(Error::ValidationError(format!(
                "Market {} still has {} open orders", symbol, open_orders
            )));
        }

        info!("Unregistering market: {}", symbol);
        self.order_books.remove(symbol);
        Ok(())
    }

    /// Whether a book exists for the market
    pub fn has_market(&self, symbol: &str) -> bool {
        self.order_books.contains_key(symbol)
    }

    /// Symbols of all registered markets
    pub fn markets(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.order_books.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    fn book(&self, symbol: &str) -> Result<Arc<RwLock<OrderBook>>> {
        self.order_books
            .get(symbol)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::MarketNotFound(format!("Market not found: {}", symbol)))
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    /// Orders of one user matching the filter, newest first
    pub fn orders_for_user(&self, user_id: Uuid, filter: &OrderFilter) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.user_id == user_id && filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Trades a user took part in, newest first
    pub fn trades_for_user(&self, user_id: Uuid, symbol: Option<&str>, limit: usize) -> Result<Vec<Trade>> {
        let trades = self.trades.read().map_err(poisoned)?;
        Ok(trades
            .iter()
            .rev()
            .filter(|t| t.involves(user_id) && symbol.map_or(true, |s| s == t.symbol))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Total number of orders ever accepted
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Total number of trades executed
    pub fn trade_count(&self) -> Result<usize> {
        Ok(self.trades.read().map_err(poisoned)?.len())
    }

    /// Best prices, last price and resting order count for a market
    pub fn book_top(&self, symbol: &str) -> Result<BookTop> {
        let book = self.book(symbol)?;
        let book = book.read().map_err(poisoned)?;
        Ok(BookTop {
            best_bid: book.best_bid(),
            best_ask: book.best_ask(),
            last_price: book.last_price,
            open_orders: book.order_count(),
        })
    }

    pub fn best_bid(&self, symbol: &str) -> Result<Option<Price>> {
        Ok(self.book_top(symbol)?.best_bid)
    }

    pub fn best_ask(&self, symbol: &str) -> Result<Option<Price>> {
        Ok(self.book_top(symbol)?.best_ask)
    }

    /// Resting orders on one market, or on all markets
    pub fn open_order_count(&self, symbol: Option<&str>) -> Result<usize> {
        match symbol {
            Some(symbol) => Ok(self.book_top(symbol)?.open_orders),
            None => {
                let mut total = 0;
                for entry in self.order_books.iter() {
                    total += entry.value().read().map_err(poisoned)?.order_count();
                }
                Ok(total)
            }
        }
    }

    /// Quantity a taker on `side` could fill right now, up to `limit_price`
    pub fn fillable_quantity(&self, symbol: &str, side: Side, limit_price: Option<Price>) -> Result<Quantity> {
        let book = self.book(symbol)?;
        let book = book.read().map_err(poisoned)?;
        Ok(book.fillable_quantity(side, limit_price))
    }

    /// Get market depth: bids highest first, asks lowest first
    pub fn get_market_depth(&self, symbol: &str, limit: usize) -> Result<(Vec<(Price, Quantity)>, Vec<(Price, Quantity)>)> {
        let book = self.book(symbol)?;
        let book = book.read().map_err(poisoned)?;
        Ok((book.bid_levels(limit), book.ask_levels(limit)))
    }

    /// Quote cost of a market buy of `quantity` against the current asks
    pub fn estimate_market_buy_cost(&self, symbol: &str, quantity: Quantity) -> Result<Option<Amount>> {
        let book = self.book(symbol)?;
        let book = book.read().map_err(poisoned)?;
        Ok(book.estimate_buy_cost(quantity))
    }

    /// Cancel a resting order owned by `user_id`
    pub fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Cancellation> {
        let known = self
            .get_order(order_id)
            .ok_or_else(|| Error::OrderNotFound(format!("Order not found: {}", order_id)))?;

        if known.user_id != user_id {
            return Err(Error::AuthorizationError(format!(
                "Order {} does not belong to {}", order_id, user_id
            )));
        }
        if !known.is_active() {
            return Err(Error::InvalidOrder(format!(
                "Order {} is {:?} and cannot be cancelled", order_id, known.status
            )));
        }

        let book = self.book(&known.symbol)?;
        let mut book = book.write().map_err(poisoned)?;

        // The book is authoritative: the order may have filled since it was looked up
        let mut order = book.remove_order(order_id).ok_or_else(|| {
            Error::InvalidOrder(format!("Order {} is no longer open", order_id))
        })?;

        let unlocked = order.locked_amount;
        order.locked_amount = Amount::ZERO;
        order.status = Status::Cancelled;
        order.updated_at = Utc::now();
        self.orders.insert(order.id, order.clone());

        info!("Cancelled order {} ({} remaining)", order.id, order.remaining_quantity);
        Ok(Cancellation {
            order,
            unlocked,
            book: book.snapshot(self.snapshot_depth),
        })
    }

    /// Process an incoming order.
    ///
    /// `order.locked_amount` must hold the funds reserved for it; market buys
    /// never spend more quote than that.
    pub fn place_order(&self, order: Order) -> Result<MatchingResult> {
        self.place_order_with_fees(order, &FeeRates::default())
    }

    /// Process an incoming order, charging `fees` on every trade it produces
    pub fn place_order_with_fees(&self, order: Order, fees: &FeeRates) -> Result<MatchingResult> {
        validate(&order)?;

        // Check if we have an order book for this market
        let book = self.book(&order.symbol)?;
        let mut book = book.write().map_err(poisoned)?;

        if order.order_type == OrderType::Market && book.side(order.side.opposite()).is_empty() {
            return Err(Error::ValidationError(format!(
                "Cannot execute market {} order, no liquidity",
                if order.side == Side::Buy { "buy" } else { "sell" }
            )));
        }

        if order.time_in_force == TimeInForce::FOK {
            let fillable = if order.order_type == OrderType::Market && order.side == Side::Buy {
                book.affordable_quantity(order.quantity, order.locked_amount)
            } else {
                book.fillable_quantity(order.side, order.price)
            };
            if fillable < order.quantity {
                return Err(Error::InvalidOrder(format!(
                    "Fill-or-kill order for {} cannot be filled, only {} available",
                    order.quantity, fillable
                )));
            }
        }

        debug!("Processing {:?} {:?} order: {}", order.order_type, order.side, order.id);
        let mut taker = order;
        let (maker_orders, trades) = match_against_book(&mut taker, &mut book, fees);

        let keep = if taker.remaining_quantity.is_zero() {
            Amount::ZERO
        } else if taker.can_rest() {
            debug!("Adding remaining limit order to the book: {}", taker.id);
            taker.required_lock()
        } else {
            debug!("Order {} not fully filled, cancelling remainder", taker.id);
            taker.status = Status::Cancelled;
            Amount::ZERO
        };

        let taker_release = (taker.locked_amount - keep).max(Amount::ZERO);
        taker.locked_amount -= taker_release;
        taker.updated_at = Utc::now();

        if taker.is_active() {
            book.add_order(taker.clone());
        }

        // Record history while the book is still locked so readers never see a fill
        // without its orders
        self.orders.insert(taker.id, taker.clone());
        for maker in &maker_orders {
            self.orders.insert(maker.id, maker.clone());
        }
        if !trades.is_empty() {
            self.trades.write().map_err(poisoned)?.extend(trades.iter().cloned());
        }

        Ok(MatchingResult {
            taker_order: taker,
            maker_orders,
            trades,
            taker_release,
            book: book.snapshot(self.snapshot_depth),
        })
    }
}

fn validate(order: &Order) -> Result<()> {
    if order.quantity <= Quantity::ZERO {
        return Err(Error::InvalidOrder("Quantity must be positive".to_string()));
    }
    if order.status != Status::Pending || order.remaining_quantity != order.quantity {
        return Err(Error::InvalidOrder(format!("Order {} was already processed", order.id)));
    }
    match (order.order_type, order.price) {
        (OrderType::Limit, None) => Err(Error::InvalidOrder("Limit orders must have a price".to_string())),
        (OrderType::Limit, Some(price)) if price <= Price::ZERO => {
            Err(Error::InvalidOrder("Price must be positive".to_string()))
        }
        _ => Ok(()),
    }
}

/// Match a taker against the opposite side in price-time priority.
/// Every fill executes at the maker's price.
fn match_against_book(taker: &mut Order, book: &mut OrderBook, fees: &FeeRates) -> (Vec<Order>, Vec<Trade>) {
    let maker_side = taker.side.opposite();
    let mut makers = Vec::new();
    let mut trades = Vec::new();

    while taker.remaining_quantity > Quantity::ZERO {
        let Some(best) = book.side(maker_side).best_price() else {
            break; // No more liquidity
        };

        if let Some(limit) = taker.price {
            if !book.would_match(limit, taker.side) {
                break;
            }
        }

        let Some(maker) = book.best_maker_mut(maker_side) else {
            break;
        };

        let mut quantity = Quantity::min(taker.remaining_quantity, maker.remaining_quantity);
        if taker.side == Side::Buy && taker.order_type == OrderType::Market {
            // A market buy is bounded by the quote it reserved
            let affordable = precision::floor_quantity(taker.locked_amount / best);
            quantity = quantity.min(affordable);
            if quantity <= Quantity::ZERO {
                break;
            }
        }

        let mut trade = Trade::between(taker, maker, best, quantity);
        trade.apply_fees(fees);
        maker.fill(quantity, best);
        taker.fill(quantity, best);

        let maker_done = maker.is_filled();
        let snapshot = maker.clone();
        if maker_done {
            book.pop_best_maker(maker_side);
        }

        debug!(
            "Matched {} @ {} between taker {} and maker {}",
            quantity, best, taker.id, snapshot.id
        );

        book.set_last_price(best);
        makers.push(snapshot);
        trades.push(trade);
    }

    (makers, trades)
}
