mod order_book;
pub mod engine;

pub use engine::{BookTop, Cancellation, MatchingEngine, MatchingResult, OrderFilter, OrderScope};
pub use order_book::{BookSide, BookSnapshot, OrderBook};
