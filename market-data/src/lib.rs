//! Market data service for providing real-time market data

mod models;
mod service;
mod window;
pub mod channel;

pub use channel::{MarketDataChannel, Topic, TopicReceiver};
pub use models::{MarketDepth, MarketEvent, MarketStats, PriceLevel, Ticker, TradeMessage};
pub use service::{MarketDataService, MAX_RECENT_TRADES};
