//! Admin console back end: typed resource stores and the audit log

pub mod audit;
pub mod service;
pub mod store;

pub use audit::{AuditLog, InMemoryAuditLog, PostgresAuditLog};
pub use service::AdminService;
pub use store::{Resource, ResourceStore};
