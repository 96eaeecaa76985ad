//! Read model views maintained by projections.

pub mod order_book;

pub use order_book::{OrderBookView, OrderFilter, OrderSummary};
