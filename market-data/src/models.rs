//! Market data models

use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Quantity};
use common::model::order::Side;
use common::model::trade::Trade;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

/// Market depth (order book)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct MarketDepth {
    /// Market symbol
    pub symbol: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Bid side sorted by price in descending order
    pub bids: Vec<PriceLevel>,
    /// Ask side sorted by price in ascending order
    pub asks: Vec<PriceLevel>,
}

impl MarketDepth {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }
}

/// Price level in order book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PriceLevel {
    pub price: Price,
    /// Total quantity resting at this price
    pub quantity: Quantity,
}

/// Public view of a trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct TradeMessage {
    /// Unique trade ID
    pub id: Uuid,
    /// Market symbol
    pub symbol: String,
    pub price: Price,
    pub quantity: Quantity,
    /// Side that was the taker (initiated the match)
    pub taker_side: Side,
    pub timestamp: DateTime<Utc>,
}

impl From<&Trade> for TradeMessage {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id,
            symbol: trade.symbol.clone(),
            price: trade.price,
            quantity: trade.quantity,
            taker_side: trade.taker_side,
            timestamp: trade.created_at,
        }
    }
}

/// Market ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Ticker {
    /// Market symbol
    pub symbol: String,
    /// Best bid price
    pub bid: Option<Price>,
    /// Best ask price
    pub ask: Option<Price>,
    /// Last trade price
    pub last: Option<Price>,
    /// 24h price change
    pub change_24h: Option<Price>,
    /// 24h price change percentage
    pub change_24h_percent: Option<f64>,
    /// 24h high price
    pub high_24h: Option<Price>,
    /// 24h low price
    pub low_24h: Option<Price>,
    /// 24h volume in base asset
    pub volume_24h: Quantity,
    /// 24h volume in quote asset
    pub quote_volume_24h: Amount,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bid: None,
            ask: None,
            last: None,
            change_24h: None,
            change_24h_percent: None,
            high_24h: None,
            low_24h: None,
            volume_24h: Quantity::ZERO,
            quote_volume_24h: Amount::ZERO,
            timestamp: Utc::now(),
        }
    }
}

/// Rolling 24 hour statistics for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct MarketStats {
    pub symbol: String,
    /// Price of the first trade inside the window
    pub open_24h: Option<Price>,
    pub last_price: Option<Price>,
    pub high_24h: Option<Price>,
    pub low_24h: Option<Price>,
    pub volume_24h: Quantity,
    pub quote_volume_24h: Amount,
    pub trade_count_24h: usize,
    pub timestamp: DateTime<Utc>,
}

/// Message published on a market data topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MarketEvent {
    OrderBook(MarketDepth),
    Trade(TradeMessage),
    Ticker(Ticker),
}
