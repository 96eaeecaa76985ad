//! Shared types used across the storefront back-office crates.

mod types;

pub use types::AggregateId;
