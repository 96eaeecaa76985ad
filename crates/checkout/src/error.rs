//! Checkout error types.

use domain::order::OrderError;
use domain::{DomainError, ProductId, ValidationErrors};
use event_store::EventStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        requested: u32,
    },

    #[error("Product {product_id} requires a {missing} selection")]
    VariantRequired { product_id: ProductId, missing: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Domain error: {0}")]
    Domain(DomainError),

    #[error("Event store error: {0}")]
    EventStore(EventStoreError),
}

impl CheckoutError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CheckoutError::Conflict(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::VariantRequired { .. } => "variant_required",
            CheckoutError::NotFound(_) => "not_found",
            CheckoutError::Conflict(_) => "conflict",
            CheckoutError::Authorization(_) => "authorization",
            CheckoutError::Domain(_) => "domain",
            CheckoutError::EventStore(_) => "event_store",
        }
    }
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        CheckoutError::Validation(errors)
    }
}

impl From<EventStoreError> for CheckoutError {
    fn from(e: EventStoreError) -> Self {
        if e.is_conflict() {
            CheckoutError::Conflict(e.to_string())
        } else {
            CheckoutError::EventStore(e)
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(errors) => CheckoutError::Validation(errors),
            DomainError::NotFound { .. } => CheckoutError::NotFound(e.to_string()),
            DomainError::EventStore(inner) => inner.into(),
            DomainError::Order(OrderError::InvalidTransition { .. }) => {
                CheckoutError::Validation(ValidationErrors::single("status", e.to_string()))
            }
            other => CheckoutError::Domain(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
