//! Application configuration

use std::collections::HashSet;
use std::env;

use common::error::{Error, Result};
use uuid::Uuid;

/// Account that receives trading and withdrawal fees unless `FEE_ACCOUNT_ID` is set
pub const DEFAULT_FEE_ACCOUNT: Uuid = Uuid::from_u128(0xfee);

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API port
    pub port: u16,
    /// Database URL; in-memory storage when unset
    pub database_url: Option<String>,
    /// Maximum connections in the database pool
    pub db_pool_size: u32,
    /// Platform account credited with fees
    pub fee_account_id: Uuid,
    /// Callers allowed on the admin routes
    pub admin_ids: HashSet<Uuid>,
    /// Levels per side published on order book updates
    pub order_book_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            db_pool_size: 5,
            fee_account_id: DEFAULT_FEE_ACCOUNT,
            admin_ids: HashSet::new(),
            order_book_depth: 20,
        }
    }
}

impl AppConfig {
    /// Create a configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_pool_size: parse_var("DB_POOL_SIZE")?.unwrap_or(defaults.db_pool_size),
            fee_account_id: parse_var("FEE_ACCOUNT_ID")?.unwrap_or(defaults.fee_account_id),
            admin_ids: match env::var("ADMIN_IDS") {
                Ok(ids) => parse_admin_ids(&ids)?,
                Err(_) => defaults.admin_ids,
            },
            order_book_depth: parse_var("ORDER_BOOK_DEPTH")?.unwrap_or(defaults.order_book_depth),
        })
    }

    pub fn is_admin(&self, id: Uuid) -> bool {
        self.admin_ids.contains(&id)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::ConfigurationError(format!("Invalid value for {}: {}", name, value))),
        Err(_) => Ok(None),
    }
}

/// Parse a comma separated list of account IDs
pub fn parse_admin_ids(value: &str) -> Result<HashSet<Uuid>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            Uuid::parse_str(id)
                .map_err(|_| Error::ConfigurationError(format!("Invalid admin id: {}", id)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = parse_admin_ids(&format!("{}, {},", a, b)).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));

        assert!(parse_admin_ids("not-a-uuid").is_err());
        assert!(parse_admin_ids("").unwrap().is_empty());
    }
}
