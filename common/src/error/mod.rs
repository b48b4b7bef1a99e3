//! Domain error shared by every service of the exchange
//!
//! Services return [`Result`]; the gateway maps each variant to an HTTP status.

use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Order rejected by market rules or not in a state the request needs
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Available balance below what an order or withdrawal needs
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Asset, fee config, ad, insurance plan or lucky draw missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Bad environment or startup settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Caller may not act on this account, order or withdrawal
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Audit snapshots and JSON columns
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Prefix an error message with what was being done, keeping the variant
pub trait ErrorExt<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            match e {
                Error::Internal(msg) => Error::Internal(format!("{}: {}", context, msg)),
                Error::InvalidOrder(msg) => Error::InvalidOrder(format!("{}: {}", context, msg)),
                Error::InsufficientBalance(msg) => Error::InsufficientBalance(format!("{}: {}", context, msg)),
                Error::OrderNotFound(msg) => Error::OrderNotFound(format!("{}: {}", context, msg)),
                Error::MarketNotFound(msg) => Error::MarketNotFound(format!("{}: {}", context, msg)),
                Error::AccountNotFound(msg) => Error::AccountNotFound(format!("{}: {}", context, msg)),
                Error::ResourceNotFound(msg) => Error::ResourceNotFound(format!("{}: {}", context, msg)),
                Error::ValidationError(msg) => Error::ValidationError(format!("{}: {}", context, msg)),
                Error::ConfigurationError(msg) => Error::ConfigurationError(format!("{}: {}", context, msg)),
                Error::AuthorizationError(msg) => Error::AuthorizationError(format!("{}: {}", context, msg)),
                // Source errors carry their own detail
                other @ (Error::Database(_) | Error::Migration(_) | Error::Serialization(_)) => other,
            }
        })
    }
}
