//! Shared vocabulary of the exchange: domain models, decimal money types,
//! the domain error and PostgreSQL pool setup.

pub mod error;
pub mod model;
pub mod decimal;
pub mod db;

pub use error::{Error, Result, ErrorExt};
pub use decimal::*;

// Re-export utoipa for use in model ToSchema derives
#[cfg(feature = "utoipa")]
pub use utoipa;
