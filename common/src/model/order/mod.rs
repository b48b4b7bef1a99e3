//! Order models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Amount, Price, Quantity};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an order on this side matches against
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum OrderType {
    /// Market order to be executed immediately at the current market price
    Market,
    /// Limit order to be executed at specified price or better
    Limit,
}

/// Order time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum TimeInForce {
    /// Good till cancelled
    GTC,
    /// Immediate or cancel
    IOC,
    /// Fill or kill
    FOK,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum Status {
    /// Accepted and waiting on the book with nothing filled yet
    Pending,
    /// Some quantity filled, the remainder is still open
    PartiallyFilled,
    /// Order has been filled completely
    Filled,
    /// Order has been cancelled (by the owner, or the unfilled part of a market/IOC order)
    Cancelled,
    /// Order has been rejected
    Rejected,
}

impl Status {
    /// Whether an order in this status can still trade
    pub fn is_open(self) -> bool {
        matches!(self, Status::Pending | Status::PartiallyFilled)
    }
}

/// Order model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    /// Owner account ID
    pub user_id: Uuid,
    /// Market symbol (e.g., "BTC-USDT")
    pub symbol: String,
    /// Order side (buy or sell)
    pub side: Side,
    /// Order type
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Price (for limit orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Original quantity
    pub quantity: Quantity,
    /// Remaining quantity
    pub remaining_quantity: Quantity,
    /// Cumulative matched quantity
    pub filled_quantity: Quantity,
    /// Average fill price
    pub average_fill_price: Option<Price>,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Current status
    pub status: Status,
    /// Funds still reserved for this order (quote asset for buys, base asset for sells)
    pub locked_amount: Amount,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new limit order
    pub fn new_limit(
        user_id: Uuid,
        symbol: String,
        side: Side,
        price: Price,
        quantity: Quantity,
        time_in_force: TimeInForce,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            quantity,
            remaining_quantity: quantity,
            filled_quantity: Quantity::ZERO,
            average_fill_price: None,
            time_in_force,
            status: Status::Pending,
            locked_amount: Amount::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new market order
    pub fn new_market(
        user_id: Uuid,
        symbol: String,
        side: Side,
        quantity: Quantity,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            side,
            order_type: OrderType::Market,
            price: None,
            quantity,
            remaining_quantity: quantity,
            filled_quantity: Quantity::ZERO,
            average_fill_price: None,
            time_in_force: TimeInForce::IOC, // Market orders never rest
            status: Status::Pending,
            locked_amount: Amount::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the order is fully filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero() || self.status == Status::Filled
    }

    /// Check if the order is active (can be matched)
    pub fn is_active(&self) -> bool {
        self.status.is_open()
    }

    /// Whether the unfilled remainder of this order may rest on the book
    pub fn can_rest(&self) -> bool {
        self.order_type == OrderType::Limit && self.time_in_force == TimeInForce::GTC
    }

    /// Funds a resting remainder of this order needs to keep reserved
    pub fn required_lock(&self) -> Amount {
        match (self.side, self.price) {
            (Side::Buy, Some(price)) => price * self.remaining_quantity,
            (Side::Buy, None) => Amount::ZERO,
            (Side::Sell, _) => self.remaining_quantity,
        }
    }

    /// Apply a fill of `quantity` at `price`, consuming the matching part of the reservation
    pub fn fill(&mut self, quantity: Quantity, price: Price) {
        self.remaining_quantity -= quantity;
        self.filled_quantity += quantity;

        // Running mean, so the cumulative notional never has to be represented
        let average = self.average_fill_price.unwrap_or(price);
        let step = (price - average)
            .checked_mul(quantity)
            .map(|delta| delta / self.filled_quantity)
            .unwrap_or_else(|| (price - average) * (quantity / self.filled_quantity));
        self.average_fill_price = Some(average + step);

        let consumed = match self.side {
            Side::Buy => price * quantity,
            Side::Sell => quantity,
        };
        self.locked_amount -= consumed;

        self.status = if self.remaining_quantity.is_zero() {
            Status::Filled
        } else {
            Status::PartiallyFilled
        };
        self.updated_at = Utc::now();
    }
}
