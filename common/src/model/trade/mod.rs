//! Trade models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{precision, Amount, Price, Quantity};
use crate::model::order::{Order, Side};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Maker and taker fee rates applied to a market's trades
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeeRates {
    pub maker: Amount,
    pub taker: Amount,
}

/// Trade model representing a matched order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Trade {
    /// Unique trade ID
    pub id: Uuid,
    /// Market symbol
    pub symbol: String,
    /// Price at which the trade executed
    pub price: Price,
    /// Quantity traded
    pub quantity: Quantity,
    /// Total amount (price * quantity)
    pub amount: Amount,
    /// Buyer order ID
    pub buyer_order_id: Uuid,
    /// Seller order ID
    pub seller_order_id: Uuid,
    /// Buyer user ID
    pub buyer_id: Uuid,
    /// Seller user ID
    pub seller_id: Uuid,
    /// Side that was the taker (initiated the match)
    pub taker_side: Side,
    /// Fee charged to the buyer, in the base asset
    pub buyer_fee: Amount,
    /// Fee charged to the seller, in the quote asset
    pub seller_fee: Amount,
    /// Timestamp when the trade occurred
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Create a trade between a taker and the resting maker it matched
    pub fn between(taker: &Order, maker: &Order, price: Price, quantity: Quantity) -> Self {
        let (buyer, seller) = match taker.side {
            Side::Buy => (taker, maker),
            Side::Sell => (maker, taker),
        };

        Self {
            id: Uuid::new_v4(),
            symbol: taker.symbol.clone(),
            price,
            quantity,
            amount: price * quantity,
            buyer_order_id: buyer.id,
            seller_order_id: seller.id,
            buyer_id: buyer.user_id,
            seller_id: seller.user_id,
            taker_side: taker.side,
            buyer_fee: Amount::ZERO,
            seller_fee: Amount::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Charge fees: the buyer pays in the base asset it receives, the seller
    /// in the quote asset it receives
    pub fn apply_fees(&mut self, rates: &FeeRates) {
        let (buyer_rate, seller_rate) = match self.taker_side {
            Side::Buy => (rates.taker, rates.maker),
            Side::Sell => (rates.maker, rates.taker),
        };
        self.buyer_fee = precision::round_quantity(self.quantity * buyer_rate);
        self.seller_fee = precision::round_price(self.amount * seller_rate);
    }

    /// Whether the given user was on either side of the trade
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}
