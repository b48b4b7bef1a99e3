//! Market models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{precision, Amount, Price, Quantity};
use crate::error::{Error, Result};
use crate::model::order::Side;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Market configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Market {
    /// Unique market ID (assigned on creation)
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Market symbol (e.g., "BTC-USDT")
    pub symbol: String,
    /// Base asset (e.g., "BTC")
    pub base_asset: String,
    /// Quote asset (e.g., "USDT")
    pub quote_asset: String,
    /// Minimum price change (tick size)
    pub price_tick: Price,
    /// Minimum quantity change (lot size)
    pub quantity_step: Quantity,
    /// Minimum order size in quote currency
    #[serde(default)]
    pub min_order_size: Amount,
    /// Whether trading is enabled
    #[serde(default = "enabled")]
    pub trading_enabled: bool,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn enabled() -> bool {
    true
}

impl Market {
    /// Asset an order on `side` must reserve: quote for buys, base for sells
    pub fn locked_asset(&self, side: Side) -> &str {
        match side {
            Side::Buy => &self.quote_asset,
            Side::Sell => &self.base_asset,
        }
    }

    /// Asset an order on `side` receives when it fills
    pub fn received_asset(&self, side: Side) -> &str {
        self.locked_asset(side.opposite())
    }

    /// Check the configuration is usable for trading
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::ValidationError("Market symbol is required".to_string()));
        }
        if self.base_asset.trim().is_empty() || self.quote_asset.trim().is_empty() {
            return Err(Error::ValidationError("Base and quote assets are required".to_string()));
        }
        if self.base_asset == self.quote_asset {
            return Err(Error::ValidationError(format!(
                "Base and quote asset must differ: {}", self.base_asset
            )));
        }
        if self.price_tick <= Price::ZERO || self.quantity_step <= Quantity::ZERO {
            return Err(Error::ValidationError("Tick and step sizes must be positive".to_string()));
        }
        if self.min_order_size < Amount::ZERO {
            return Err(Error::ValidationError("Minimum order size cannot be negative".to_string()));
        }
        Ok(())
    }

    /// Check an order's price and quantity against tick, step and minimum size
    pub fn check_order(&self, price: Option<Price>, quantity: Quantity) -> Result<()> {
        if !precision::is_multiple_of(quantity, self.quantity_step) {
            return Err(Error::InvalidOrder(format!(
                "Quantity {} is not a multiple of step {}", quantity, self.quantity_step
            )));
        }

        if let Some(price) = price {
            if !precision::is_multiple_of(price, self.price_tick) {
                return Err(Error::InvalidOrder(format!(
                    "Price {} is not a multiple of tick {}", price, self.price_tick
                )));
            }
            let value = order_value(price, quantity)?;
            if value < self.min_order_size {
                return Err(Error::InvalidOrder(format!(
                    "Order value {} is below the minimum of {} {}",
                    value, self.min_order_size, self.quote_asset
                )));
            }
        }

        Ok(())
    }
}

/// `price * quantity`, rejecting orders too large to represent
pub fn order_value(price: Price, quantity: Quantity) -> Result<Amount> {
    price.checked_mul(quantity).ok_or_else(|| {
        Error::ValidationError(format!("Order value of {} at {} is too large", quantity, price))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;

    fn market() -> Market {
        serde_json::from_value(serde_json::json!({
            "symbol": "BTC-USDT",
            "base_asset": "BTC",
            "quote_asset": "USDT",
            "price_tick": "0.01",
            "quantity_step": "0.001",
            "min_order_size": "10"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_fill_in_identity_and_flags() {
        let market = market();
        assert!(market.trading_enabled);
        assert!(market.validate().is_ok());
        assert_eq!(market.locked_asset(Side::Buy), "USDT");
        assert_eq!(market.received_asset(Side::Buy), "BTC");
    }

    #[test]
    fn order_checks() {
        let market = market();
        assert!(market.check_order(Some(dec!(100.00)), dec!(0.5)).is_ok());
        assert!(matches!(market.check_order(Some(dec!(100.001)), dec!(0.5)), Err(Error::InvalidOrder(_))));
        assert!(matches!(market.check_order(Some(dec!(100)), dec!(0.0005)), Err(Error::InvalidOrder(_))));
        assert!(matches!(market.check_order(Some(dec!(1)), dec!(1)), Err(Error::InvalidOrder(_))));
        assert!(market.check_order(None, dec!(0.001)).is_ok());
    }

    #[test]
    fn oversized_order_value_is_rejected() {
        let market = market();
        let huge = dec!(1000000000000000);
        assert!(matches!(market.check_order(Some(huge), huge), Err(Error::ValidationError(_))));
    }
}
