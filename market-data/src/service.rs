//! Market data service implementation

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use common::decimal::{Price, Quantity};
use common::model::trade::Trade;
use dashmap::DashMap;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::channel::{MarketDataChannel, Topic};
use crate::models::{MarketDepth, MarketEvent, MarketStats, PriceLevel, Ticker, TradeMessage};
use crate::window::TradeWindow;

/// Trades kept per market for the recent-trades view
pub const MAX_RECENT_TRADES: usize = 1000;

/// Market data service for providing real-time market data
pub struct MarketDataService {
    /// Market data channel
    channel: Arc<MarketDataChannel>,
    /// Latest market depths
    market_depths: DashMap<String, MarketDepth>,
    /// Latest tickers
    tickers: DashMap<String, Ticker>,
    /// Recent trades by market, oldest first
    recent_trades: DashMap<String, VecDeque<TradeMessage>>,
    /// Rolling 24h aggregates by market
    windows: DashMap<String, TradeWindow>,
    /// Sequence of the book snapshot each market last published
    book_sequences: DashMap<String, u64>,
}

impl Default for MarketDataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketDataService {
    /// Create a new market data service
    pub fn new() -> Self {
        Self {
            channel: Arc::new(MarketDataChannel::new()),
            market_depths: DashMap::new(),
            tickers: DashMap::new(),
            recent_trades: DashMap::new(),
            windows: DashMap::new(),
            book_sequences: DashMap::new(),
        }
    }

    /// Get the market data channel
    pub fn channel(&self) -> Arc<MarketDataChannel> {
        self.channel.clone()
    }

    /// Start tracking a market with an empty book and ticker
    pub fn register_market(&self, symbol: &str) {
        self.market_depths
            .entry(symbol.to_string())
            .or_insert_with(|| MarketDepth::empty(symbol));
        self.tickers
            .entry(symbol.to_string())
            .or_insert_with(|| Ticker::empty(symbol));
    }

    /// Stop tracking a market and close its topics
    pub fn remove_market(&self, symbol: &str) {
        self.market_depths.remove(symbol);
        self.tickers.remove(symbol);
        self.recent_trades.remove(symbol);
        self.windows.remove(symbol);
        self.book_sequences.remove(symbol);
        self.channel.close_market(symbol);
    }

    /// Publish a book snapshot unless a later one was already published.
    /// Returns whether the snapshot was applied.
    pub fn apply_book_snapshot(
        &self,
        symbol: &str,
        sequence: u64,
        bids: Vec<(Price, Quantity)>,
        asks: Vec<(Price, Quantity)>,
    ) -> bool {
        // The entry guard serialises publishers of the same market
        let mut latest = self.book_sequences.entry(symbol.to_string()).or_insert(0);
        if *latest > sequence {
            debug!("Dropping stale book {} of {} (have {})", sequence, symbol, *latest);
            return false;
        }
        *latest = sequence;
        self.update_order_book(symbol, bids, asks);
        true
    }

    /// Update order book
    pub fn update_order_book(&self, symbol: &str, bids: Vec<(Price, Quantity)>, asks: Vec<(Price, Quantity)>) {
        let to_levels = |levels: Vec<(Price, Quantity)>| -> Vec<PriceLevel> {
            levels
                .into_iter()
                .map(|(price, quantity)| PriceLevel { price, quantity })
                .collect()
        };

        let depth = MarketDepth {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            bids: to_levels(bids),
            asks: to_levels(asks),
        };

        // Store latest market depth
        self.market_depths.insert(symbol.to_string(), depth.clone());

        let ticker = {
            let mut ticker = self
                .tickers
                .entry(symbol.to_string())
                .or_insert_with(|| Ticker::empty(symbol));
            ticker.bid = depth.bids.first().map(|level| level.price);
            ticker.ask = depth.asks.first().map(|level| level.price);
            ticker.timestamp = depth.timestamp;
            ticker.clone()
        };

        self.channel
            .publish(Topic::OrderBook(symbol.to_string()), MarketEvent::OrderBook(depth));
        self.channel
            .publish(Topic::Ticker(symbol.to_string()), MarketEvent::Ticker(ticker));
    }

    /// Process a new trade
    pub fn process_trade(&self, trade: &Trade) {
        let symbol = trade.symbol.as_str();
        let message = TradeMessage::from(trade);
        debug!("Publishing trade {} on {}", trade.id, symbol);

        {
            let mut trades = self.recent_trades.entry(symbol.to_string()).or_default();
            trades.push_back(message.clone());
            while trades.len() > MAX_RECENT_TRADES {
                trades.pop_front();
            }
        }

        let stats = {
            let now = Utc::now();
            let mut window = self.windows.entry(symbol.to_string()).or_default();
            window.push(&message, now);
            window.stats(symbol, now)
        };

        let ticker = {
            let mut ticker = self
                .tickers
                .entry(symbol.to_string())
                .or_insert_with(|| Ticker::empty(symbol));
            apply_stats(&mut ticker, &stats);
            ticker.clone()
        };

        self.channel
            .publish(Topic::Trades(symbol.to_string()), MarketEvent::Trade(message));
        self.channel
            .publish(Topic::Ticker(symbol.to_string()), MarketEvent::Ticker(ticker));
    }

    /// Get market depth, truncated to `limit` levels per side
    pub fn get_market_depth(&self, symbol: &str, limit: usize) -> Option<MarketDepth> {
        self.market_depths.get(symbol).map(|depth| {
            let mut depth = depth.clone();
            depth.bids.truncate(limit);
            depth.asks.truncate(limit);
            depth
        })
    }

    /// Get ticker
    pub fn get_ticker(&self, symbol: &str) -> Option<Ticker> {
        self.tickers.get(symbol).map(|t| t.clone())
    }

    /// Get all tickers, sorted by symbol
    pub fn get_all_tickers(&self) -> Vec<Ticker> {
        let mut tickers: Vec<Ticker> = self.tickers.iter().map(|t| t.clone()).collect();
        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        tickers
    }

    /// Get recent trades, newest first
    pub fn get_recent_trades(&self, symbol: &str, limit: usize) -> Vec<TradeMessage> {
        self.recent_trades
            .get(symbol)
            .map(|trades| trades.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Rolling 24h statistics; `None` for unknown markets
    pub fn market_stats(&self, symbol: &str) -> Option<MarketStats> {
        let now = Utc::now();
        if let Some(mut window) = self.windows.get_mut(symbol) {
            return Some(window.stats(symbol, now));
        }
        self.tickers
            .contains_key(symbol)
            .then(|| TradeWindow::default().stats(symbol, now))
    }
}

fn apply_stats(ticker: &mut Ticker, stats: &MarketStats) {
    ticker.last = stats.last_price;
    ticker.high_24h = stats.high_24h;
    ticker.low_24h = stats.low_24h;
    ticker.volume_24h = stats.volume_24h;
    ticker.quote_volume_24h = stats.quote_volume_24h;
    ticker.timestamp = stats.timestamp;

    match (stats.open_24h, stats.last_price) {
        (Some(open), Some(last)) => {
            let change = last - open;
            ticker.change_24h = Some(change);
            ticker.change_24h_percent = if open.is_zero() {
                None
            } else {
                (change / open * Price::ONE_HUNDRED).to_f64()
            };
        }
        _ => {
            ticker.change_24h = None;
            ticker.change_24h_percent = None;
        }
    }
}
