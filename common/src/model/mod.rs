//! Domain models for the exchange

pub mod order;
pub mod trade;
pub mod market;
pub mod account;
pub mod admin;
pub mod audit;
