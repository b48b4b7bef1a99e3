//! Platform configuration rows managed from the admin console

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Amount;
use crate::error::{Error, Result};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

fn enabled() -> bool {
    true
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Amount) -> Result<()> {
    if value.is_sign_negative() {
        return Err(Error::ValidationError(format!("{} cannot be negative", field)));
    }
    Ok(())
}

fn require_positive(field: &str, value: Amount) -> Result<()> {
    if value <= Amount::ZERO {
        return Err(Error::ValidationError(format!("{} must be positive", field)));
    }
    Ok(())
}

/// A listed asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Asset {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Ticker symbol, e.g. "BSK"
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Display precision
    #[serde(default)]
    pub decimals: u32,
    #[serde(default = "enabled")]
    pub deposit_enabled: bool,
    #[serde(default = "enabled")]
    pub withdraw_enabled: bool,
    /// Flat fee charged on each withdrawal, in this asset
    #[serde(default)]
    pub withdraw_fee: Amount,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn validate(&self) -> Result<()> {
        require_text("Asset symbol", &self.symbol)?;
        require_text("Asset name", &self.name)?;
        require_non_negative("Withdrawal fee", self.withdraw_fee)
    }
}

/// Maker/taker fee rates for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct FeeConfig {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Market symbol the rates apply to
    pub symbol: String,
    /// Fraction of the received amount charged to the resting side (0.001 = 0.1%)
    pub maker_fee_rate: Amount,
    /// Fraction of the received amount charged to the incoming side
    pub taker_fee_rate: Amount,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl FeeConfig {
    pub fn validate(&self) -> Result<()> {
        require_text("Fee market symbol", &self.symbol)?;
        require_non_negative("Maker fee rate", self.maker_fee_rate)?;
        require_non_negative("Taker fee rate", self.taker_fee_rate)?;
        if self.maker_fee_rate >= Amount::ONE || self.taker_fee_rate >= Amount::ONE {
            return Err(Error::ValidationError("Fee rates must be below 1".to_string()));
        }
        Ok(())
    }
}

/// A sponsored ad that pays a reward per view (ad-mining)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Ad {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    pub target_url: String,
    /// Reward credited per completed view, in BSK
    pub reward_per_view: Amount,
    pub max_views_per_day: u32,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Ad {
    pub fn validate(&self) -> Result<()> {
        require_text("Ad title", &self.title)?;
        require_text("Ad image URL", &self.image_url)?;
        require_text("Ad target URL", &self.target_url)?;
        require_non_negative("Reward per view", self.reward_per_view)
    }
}

/// An insurance product users can subscribe to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct InsurancePlan {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    /// Asset premiums and payouts are denominated in
    pub asset: String,
    pub premium: Amount,
    pub coverage_amount: Amount,
    pub duration_days: u32,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl InsurancePlan {
    pub fn validate(&self) -> Result<()> {
        require_text("Plan name", &self.name)?;
        require_text("Plan asset", &self.asset)?;
        require_positive("Premium", self.premium)?;
        require_positive("Coverage amount", self.coverage_amount)?;
        if self.duration_days == 0 {
            return Err(Error::ValidationError("Plan duration must be at least one day".to_string()));
        }
        Ok(())
    }
}

/// Lifecycle of a lucky draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum DrawStatus {
    Draft,
    Open,
    Closed,
    Drawn,
}

/// A lucky draw configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct LuckyDraw {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    /// Ticket price in BSK
    pub ticket_price: Amount,
    pub prize_pool: Amount,
    pub max_tickets: u32,
    pub draw_at: DateTime<Utc>,
    #[serde(default = "draft")]
    pub status: DrawStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn draft() -> DrawStatus {
    DrawStatus::Draft
}

impl LuckyDraw {
    pub fn validate(&self) -> Result<()> {
        require_text("Draw name", &self.name)?;
        require_positive("Ticket price", self.ticket_price)?;
        require_positive("Prize pool", self.prize_pool)?;
        if self.max_tickets == 0 {
            return Err(Error::ValidationError("A draw needs at least one ticket".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;

    #[test]
    fn fee_rates_are_bounded() {
        let mut fee: FeeConfig = serde_json::from_value(serde_json::json!({
            "symbol": "BTC-USDT",
            "maker_fee_rate": "0.001",
            "taker_fee_rate": "0.002"
        }))
        .unwrap();
        assert!(fee.validate().is_ok());

        fee.taker_fee_rate = dec!(1);
        assert!(fee.validate().is_err());
        fee.taker_fee_rate = dec!(-0.1);
        assert!(fee.validate().is_err());
    }

    #[test]
    fn lucky_draw_defaults_to_draft() {
        let draw: LuckyDraw = serde_json::from_value(serde_json::json!({
            "name": "Weekly",
            "ticket_price": "10",
            "prize_pool": "5000",
            "max_tickets": 1000,
            "draw_at": "2026-11-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(draw.status, DrawStatus::Draft);
        assert!(draw.validate().is_ok());
    }
}
