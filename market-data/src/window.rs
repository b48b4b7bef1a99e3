//! Rolling 24h trade window
//!
//! Volume sums are kept as running totals and high/low as monotonic queues,
//! so each trade costs amortised O(1) however busy the market is.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use common::decimal::{Amount, Price, Quantity};

use crate::models::{MarketStats, TradeMessage};

#[derive(Debug, Clone)]
struct WindowTrade {
    seq: u64,
    timestamp: DateTime<Utc>,
    price: Price,
    quantity: Quantity,
}

#[derive(Debug)]
pub(crate) struct TradeWindow {
    span: Duration,
    trades: VecDeque<WindowTrade>,
    /// Candidates for the high, prices strictly decreasing
    highs: VecDeque<(u64, Price)>,
    /// Candidates for the low, prices strictly increasing
    lows: VecDeque<(u64, Price)>,
    next_seq: u64,
    volume: Quantity,
    quote_volume: Amount,
    last_price: Option<Price>,
}

impl Default for TradeWindow {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

impl TradeWindow {
    pub(crate) fn new(span: Duration) -> Self {
        Self {
            span,
            trades: VecDeque::new(),
            highs: VecDeque::new(),
            lows: VecDeque::new(),
            next_seq: 0,
            volume: Quantity::ZERO,
            quote_volume: Amount::ZERO,
            last_price: None,
        }
    }

    pub(crate) fn push(&mut self, trade: &TradeMessage, now: DateTime<Utc>) {
        self.last_price = Some(trade.price);
        self.prune(now);
        if trade.timestamp < now - self.span {
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        while self.highs.back().is_some_and(|(_, price)| *price <= trade.price) {
            self.highs.pop_back();
        }
        self.highs.push_back((seq, trade.price));
        while self.lows.back().is_some_and(|(_, price)| *price >= trade.price) {
            self.lows.pop_back();
        }
        self.lows.push_back((seq, trade.price));

        self.volume = self.volume.saturating_add(trade.quantity);
        self.quote_volume = self
            .quote_volume
            .saturating_add(trade.price.saturating_mul(trade.quantity));
        self.trades.push_back(WindowTrade {
            seq,
            timestamp: trade.timestamp,
            price: trade.price,
            quantity: trade.quantity,
        });
    }

    /// Drop trades older than the window
    fn prune(&mut self, now: DateTime<Utc>) {
        let since = now - self.span;
        while let Some(oldest) = self.trades.front() {
            if oldest.timestamp >= since {
                break;
            }
            let seq = oldest.seq;
            self.volume -= oldest.quantity;
            self.quote_volume -= oldest.price.saturating_mul(oldest.quantity);
            if self.highs.front().is_some_and(|(s, _)| *s == seq) {
                self.highs.pop_front();
            }
            if self.lows.front().is_some_and(|(s, _)| *s == seq) {
                self.lows.pop_front();
            }
            self.trades.pop_front();
        }
        if self.trades.is_empty() {
            self.volume = Quantity::ZERO;
            self.quote_volume = Amount::ZERO;
        }
    }

    pub(crate) fn stats(&mut self, symbol: &str, now: DateTime<Utc>) -> MarketStats {
        self.prune(now);
        MarketStats {
            symbol: symbol.to_string(),
            open_24h: self.trades.front().map(|trade| trade.price),
            last_price: self.last_price,
            high_24h: self.highs.front().map(|(_, price)| *price),
            low_24h: self.lows.front().map(|(_, price)| *price),
            volume_24h: self.volume,
            quote_volume_24h: self.quote_volume,
            trade_count_24h: self.trades.len(),
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::decimal::dec;
    use common::model::order::Side;
    use uuid::Uuid;

    fn trade(price: Price, quantity: Quantity, timestamp: DateTime<Utc>) -> TradeMessage {
        TradeMessage {
            id: Uuid::new_v4(),
            symbol: "BTC-USDT".to_string(),
            price,
            quantity,
            taker_side: Side::Buy,
            timestamp,
        }
    }

    #[test]
    fn expired_trades_leave_the_aggregates() {
        let start = Utc::now();
        let mut window = TradeWindow::new(Duration::minutes(10));

        window.push(&trade(dec!(120), dec!(1), start), start);
        window.push(&trade(dec!(90), dec!(2), start + Duration::minutes(5)), start + Duration::minutes(5));
        window.push(&trade(dec!(100), dec!(3), start + Duration::minutes(8)), start + Duration::minutes(8));

        let stats = window.stats("BTC-USDT", start + Duration::minutes(9));
        assert_eq!(stats.high_24h, Some(dec!(120)));
        assert_eq!(stats.low_24h, Some(dec!(90)));
        assert_eq!(stats.volume_24h, dec!(6));
        assert_eq!(stats.trade_count_24h, 3);

        // The 120 trade falls out of the window
        let stats = window.stats("BTC-USDT", start + Duration::minutes(12));
        assert_eq!(stats.open_24h, Some(dec!(90)));
        assert_eq!(stats.high_24h, Some(dec!(100)));
        assert_eq!(stats.low_24h, Some(dec!(90)));
        assert_eq!(stats.volume_24h, dec!(5));
        assert_eq!(stats.quote_volume_24h, dec!(480));

        let stats = window.stats("BTC-USDT", start + Duration::minutes(30));
        assert_eq!(stats.trade_count_24h, 0);
        assert_eq!(stats.volume_24h, Quantity::ZERO);
        assert!(stats.high_24h.is_none());
        assert_eq!(stats.last_price, Some(dec!(100)));
    }
}
