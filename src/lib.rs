//! Exchange core
//!
//! Umbrella package for the workspace. It re-exports the member crates so the
//! contract tests under `tests/` can drive the assembled HTTP router.

pub use account_service;
pub use admin_service;
pub use api_gateway;
pub use common;
pub use market_data;
pub use matching_engine;
