//! Order book implementation for price-time priority matching

use std::collections::{BTreeMap, HashMap, VecDeque};

use common::decimal::{precision, Amount, Price, Quantity};
use common::model::order::{Order, Side};
use rust_decimal::Decimal;
use uuid::Uuid;

/// One side of the book. Price levels are kept in a `BTreeMap`; inside a level
/// orders queue in arrival order, so the front of the best level is always the
/// next maker to trade.
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, VecDeque<Order>>,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Best price on this side: highest bid or lowest ask
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// Price levels from best to worst
    pub fn iter_levels(&self) -> Box<dyn Iterator<Item = (&Price, &VecDeque<Order>)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        }
    }

    /// Aggregated (price, quantity) levels, best first
    pub fn price_levels(&self, limit: usize) -> Vec<(Price, Quantity)> {
        self.iter_levels()
            .take(limit)
            .map(|(price, orders)| {
                let total_quantity = orders.iter().map(|order| order.remaining_quantity).sum();
                (*price, total_quantity)
            })
            .collect()
    }

    /// Orders resting at the given price, in time priority
    pub fn orders_at(&self, price: Price) -> Option<&VecDeque<Order>> {
        self.levels.get(&price)
    }

    /// Number of resting orders on this side
    pub fn order_count(&self) -> usize {
        self.levels.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    fn push(&mut self, price: Price, order: Order) {
        self.levels.entry(price).or_default().push_back(order);
    }

    fn remove(&mut self, price: Price, order_id: Uuid) -> Option<Order> {
        let orders = self.levels.get_mut(&price)?;
        let position = orders.iter().position(|o| o.id == order_id)?;
        let order = orders.remove(position);

        // Clean up empty price levels
        if orders.is_empty() {
            self.levels.remove(&price);
        }

        order
    }

    fn front_mut(&mut self) -> Option<&mut Order> {
        let price = self.best_price()?;
        self.levels.get_mut(&price).and_then(VecDeque::front_mut)
    }

    fn pop_front(&mut self) -> Option<Order> {
        let price = self.best_price()?;
        let orders = self.levels.get_mut(&price)?;
        let order = orders.pop_front();
        if orders.is_empty() {
            self.levels.remove(&price);
        }
        order
    }
}

/// Aggregated levels of a book as of one change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookSnapshot {
    /// Changes the book had seen; later snapshots carry larger numbers
    pub sequence: u64,
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// Order book for a single market
pub struct OrderBook {
    /// Market symbol
    pub symbol: String,
    /// Buy side (bids)
    bids: BookSide,
    /// Sell side (asks)
    asks: BookSide,
    /// Where each resting order lives, for cancellation
    index: HashMap<Uuid, (Side, Price)>,
    /// Last traded price
    pub last_price: Option<Price>,
    sequence: u64,
}

impl OrderBook {
    /// Create a new empty order book for the given market
    pub fn new(symbol: String) -> Self {
        Self {
            symbol,
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            index: HashMap::new(),
            last_price: None,
            sequence: 0,
        }
    }

    /// Rest a limit order on its side of the book. Orders without a price are ignored.
    pub fn add_order(&mut self, order: Order) {
        let Some(price) = order.price else {
            return;
        };

        self.index.insert(order.id, (order.side, price));
        self.side_mut(order.side).push(price, order);
        self.sequence += 1;
    }

    /// Remove a resting order from the book
    pub fn remove_order(&mut self, order_id: Uuid) -> Option<Order> {
        let (side, price) = self.index.remove(&order_id)?;
        let order = self.side_mut(side).remove(price, order_id)?;
        self.sequence += 1;
        Some(order)
    }

    /// Look up a resting order
    pub fn get_order(&self, order_id: Uuid) -> Option<&Order> {
        let (side, price) = self.index.get(&order_id)?;
        self.side(*side)
            .orders_at(*price)
            .and_then(|orders| orders.iter().find(|o| o.id == order_id))
    }

    /// Whether the order is resting on this book
    pub fn contains(&self, order_id: Uuid) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Get a reference to one side of the book
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// The next maker on `side`: first order at the best price
    pub fn best_maker_mut(&mut self, side: Side) -> Option<&mut Order> {
        self.sequence += 1;
        self.side_mut(side).front_mut()
    }

    /// Remove the next maker on `side` (once it has been filled)
    pub fn pop_best_maker(&mut self, side: Side) -> Option<Order> {
        let order = self.side_mut(side).pop_front()?;
        self.index.remove(&order.id);
        self.sequence += 1;
        Some(order)
    }

    /// Get the best bid price
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Get the best ask price
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Get the current spread
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Get the mid price
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some((ask + bid) / Decimal::TWO),
            _ => self.last_price,
        }
    }

    /// Get bid price levels with quantities, highest price first
    pub fn bid_levels(&self, limit: usize) -> Vec<(Price, Quantity)> {
        self.bids.price_levels(limit)
    }

    /// Get ask price levels with quantities, lowest price first
    pub fn ask_levels(&self, limit: usize) -> Vec<(Price, Quantity)> {
        self.asks.price_levels(limit)
    }

    /// Number of changes applied to the book so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Both sides aggregated to at most `limit` levels, tagged with the current sequence
    pub fn snapshot(&self, limit: usize) -> BookSnapshot {
        BookSnapshot {
            sequence: self.sequence,
            bids: self.bid_levels(limit),
            asks: self.ask_levels(limit),
        }
    }

    /// Check if an incoming order at `price` on `side` would cross the book
    pub fn would_match(&self, price: Price, side: Side) -> bool {
        match side {
            Side::Buy => self.best_ask().map_or(false, |ask| price >= ask),
            Side::Sell => self.best_bid().map_or(false, |bid| price <= bid),
        }
    }

    /// Update the last traded price
    pub fn set_last_price(&mut self, price: Price) {
        self.last_price = Some(price);
    }

    /// Number of resting orders on both sides
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Quantity an incoming order on `taker_side` could fill right now,
    /// up to `limit_price` when given
    pub fn fillable_quantity(&self, taker_side: Side, limit_price: Option<Price>) -> Quantity {
        self.side(taker_side.opposite())
            .iter_levels()
            .take_while(|(price, _)| match (taker_side, limit_price) {
                (_, None) => true,
                (Side::Buy, Some(limit)) => **price <= limit,
                (Side::Sell, Some(limit)) => **price >= limit,
            })
            .flat_map(|(_, orders)| orders.iter())
            .fold(Quantity::ZERO, |total, order| total.saturating_add(order.remaining_quantity))
    }

    /// Quantity a market buy for up to `quantity` could fill with `budget`
    /// quote, taking each maker as far as the remaining budget allows
    pub fn affordable_quantity(&self, quantity: Quantity, budget: Amount) -> Quantity {
        let mut remaining = quantity;
        let mut budget = budget;
        for (price, orders) in self.asks.iter_levels() {
            for order in orders {
                let affordable = precision::floor_quantity(budget / *price);
                let take = remaining.min(order.remaining_quantity).min(affordable);
                if take <= Quantity::ZERO {
                    return quantity - remaining;
                }
                budget -= *price * take;
                remaining -= take;
            }
        }
        quantity - remaining
    }

    /// Quote cost of buying `quantity` at market, walking the asks best first.
    /// Only the fillable part is priced; `None` when there are no asks.
    pub fn estimate_buy_cost(&self, quantity: Quantity) -> Option<Amount> {
        if self.asks.is_empty() {
            return None;
        }

        let mut remaining = quantity;
        let mut cost = Amount::ZERO;
        for (price, orders) in self.asks.iter_levels() {
            for order in orders {
                if remaining.is_zero() {
                    return Some(cost);
                }
                let take = Quantity::min(remaining, order.remaining_quantity);
                cost = cost.saturating_add(price.saturating_mul(take));
                remaining -= take;
            }
        }

        Some(cost)
    }
}
