//! Account service for managing user balances and fund reservations

pub mod repository;
pub mod service;

pub use repository::{AccountRepository, InMemoryAccountRepository, PostgresAccountRepository};
pub use service::{AccountService, RepositoryType};
