//! Channel for market data distribution
//!
//! Every topic holds only its newest event. Subscribers that fall behind skip
//! straight to the latest value instead of queueing a backlog.

use dashmap::DashMap;
use tokio::sync::watch;

use crate::models::MarketEvent;

/// Topic types for market data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Order book updates for a market
    OrderBook(String),
    /// Trades for a market
    Trades(String),
    /// Ticker updates for a market
    Ticker(String),
}

impl Topic {
    /// Build a topic from a channel name (`orderbook`, `trades`, `ticker`) and market
    pub fn parse(channel: &str, market: &str) -> Option<Self> {
        let market = market.to_string();
        match channel {
            "orderbook" => Some(Topic::OrderBook(market)),
            "trades" => Some(Topic::Trades(market)),
            "ticker" => Some(Topic::Ticker(market)),
            _ => None,
        }
    }

    pub fn channel_name(&self) -> &'static str {
        match self {
            Topic::OrderBook(_) => "orderbook",
            Topic::Trades(_) => "trades",
            Topic::Ticker(_) => "ticker",
        }
    }

    pub fn market(&self) -> &str {
        match self {
            Topic::OrderBook(market) | Topic::Trades(market) | Topic::Ticker(market) => market,
        }
    }
}

/// Receiver for one topic; `None` until the first event is published
pub type TopicReceiver = watch::Receiver<Option<MarketEvent>>;

/// Market data channel
#[derive(Default)]
pub struct MarketDataChannel {
    topics: DashMap<Topic, watch::Sender<Option<MarketEvent>>>,
}

impl MarketDataChannel {
    /// Create a new market data channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic
    pub fn subscribe(&self, topic: Topic) -> TopicReceiver {
        self.topics
            .entry(topic)
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Publish to a topic, replacing its previous event
    pub fn publish(&self, topic: Topic, event: MarketEvent) {
        self.topics
            .entry(topic)
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(event));
    }

    /// Newest event published on a topic
    pub fn latest(&self, topic: &Topic) -> Option<MarketEvent> {
        self.topics.get(topic).and_then(|sender| sender.borrow().clone())
    }

    /// Number of live receivers on a topic
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, |sender| sender.receiver_count())
    }

    /// Drop every topic of a market; open receivers see their channel close
    pub fn close_market(&self, market: &str) {
        self.topics.retain(|topic, _| topic.market() != market);
    }
}
