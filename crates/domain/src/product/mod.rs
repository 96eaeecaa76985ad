//! Catalog products and their stock.

mod aggregate;
mod events;
mod service;

pub use aggregate::{NewProduct, Product};
pub use events::{
    CostPriceChangedData, PriceChangedData, ProductDelistedData, ProductEvent, ProductListedData,
    StockDecrementedData, StockRestockedData,
};
pub use service::{CatalogService, CostPriceUpdate};

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product is not listed")]
    NotListed,

    #[error("Product already listed")]
    AlreadyListed,

    #[error("Product has been removed from the catalog")]
    Delisted,

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32 },

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("{0}")]
    Invalid(ValidationErrors),
}
