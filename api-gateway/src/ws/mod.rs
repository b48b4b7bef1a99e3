//! WebSocket API for live market data

pub mod handler;
pub mod message;

pub use handler::ws_handler;
