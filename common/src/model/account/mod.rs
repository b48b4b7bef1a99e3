//! Account models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Quantity;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Identity verification state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub enum KycStatus {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    /// Stable text form used for storage
    pub fn as_str(self) -> &'static str {
        match self {
            KycStatus::Unverified => "unverified",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }

    /// Parse the stored text form
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unverified" => Some(KycStatus::Unverified),
            "pending" => Some(KycStatus::Pending),
            "verified" => Some(KycStatus::Verified),
            "rejected" => Some(KycStatus::Rejected),
            _ => None,
        }
    }
}

/// Account model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,
    /// KYC verification status
    pub kyc_status: KycStatus,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create an unverified account with the given ID
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            kyc_status: KycStatus::Unverified,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Balance model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Balance {
    /// Account ID
    pub account_id: Uuid,
    /// Asset symbol (e.g., "BTC", "USDT")
    pub asset: String,
    /// Total balance
    pub total: Quantity,
    /// Available balance (not locked in orders)
    pub available: Quantity,
    /// Locked balance (in open orders)
    pub locked: Quantity,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Create a new balance with zero amounts
    pub fn new(account_id: Uuid, asset: String) -> Self {
        Self {
            account_id,
            asset,
            total: Quantity::ZERO,
            available: Quantity::ZERO,
            locked: Quantity::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Lock funds for an order
    pub fn lock(&mut self, amount: Quantity) -> Result<(), String> {
        if amount > self.available {
            return Err(format!("{} {} available, {} required", self.available, self.asset, amount));
        }

        self.locked = checked_add(self.locked, amount, &self.asset)?;
        self.available -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Unlock funds (on order cancel or when a reservation is no longer needed)
    pub fn unlock(&mut self, amount: Quantity) -> Result<(), String> {
        if amount > self.locked {
            return Err(format!("{} {} locked, cannot unlock {}", self.locked, self.asset, amount));
        }

        self.available = checked_add(self.available, amount, &self.asset)?;
        self.locked -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove funds that were locked for an order which has now been filled
    pub fn spend_locked(&mut self, amount: Quantity) -> Result<(), String> {
        if amount > self.locked {
            return Err(format!("{} {} locked, cannot spend {}", self.locked, self.asset, amount));
        }

        self.locked -= amount;
        self.total -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add funds to the balance; fails when the total would overflow
    pub fn deposit(&mut self, amount: Quantity) -> Result<(), String> {
        self.total = checked_add(self.total, amount, &self.asset)?;
        self.available += amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Remove funds from the balance
    pub fn withdraw(&mut self, amount: Quantity) -> Result<(), String> {
        if amount > self.available {
            return Err(format!("{} {} available, {} requested", self.available, self.asset, amount));
        }

        self.total -= amount;
        self.available -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn checked_add(current: Quantity, amount: Quantity, asset: &str) -> Result<Quantity, String> {
    current
        .checked_add(amount)
        .ok_or_else(|| format!("{} {} plus {} exceeds the largest representable amount", current, asset, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;
    use rust_decimal::Decimal;

    #[test]
    fn lock_and_unlock_move_funds_between_columns() {
        let mut balance = Balance::new(Uuid::new_v4(), "USDT".to_string());
        balance.deposit(dec!(100)).unwrap();
        balance.lock(dec!(40)).unwrap();
        assert_eq!((balance.total, balance.available, balance.locked), (dec!(100), dec!(60), dec!(40)));

        assert!(balance.lock(dec!(61)).is_err());
        assert!(balance.unlock(dec!(41)).is_err());
        balance.unlock(dec!(40)).unwrap();
        assert_eq!((balance.available, balance.locked), (dec!(100), Decimal::ZERO));
    }

    #[test]
    fn deposit_overflow_is_an_error() {
        let mut balance = Balance::new(Uuid::new_v4(), "USDT".to_string());
        balance.deposit(Decimal::MAX).unwrap();
        assert!(balance.deposit(Decimal::MAX).is_err());
        assert_eq!(balance.total, Decimal::MAX);
        assert_eq!(balance.available, Decimal::MAX);
    }
}
