//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::account::AccountError;
use crate::order::OrderError;
use crate::product::ProductError;
use crate::purchase::PurchaseError;
use crate::settings::SettingsError;
use crate::validation::ValidationErrors;

/// Errors surfaced by domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{aggregate_type} not found: {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Product error: {0}")]
    Product(ProductError),

    #[error("Order error: {0}")]
    Order(OrderError),

    #[error("Account error: {0}")]
    Account(AccountError),

    #[error("Purchase error: {0}")]
    Purchase(PurchaseError),

    #[error("Settings error: {0}")]
    Settings(SettingsError),
}

impl DomainError {
    pub fn not_found(aggregate_type: &'static str, aggregate_id: impl ToString) -> Self {
        DomainError::NotFound {
            aggregate_type,
            aggregate_id: aggregate_id.to_string(),
        }
    }

    /// True when a concurrent writer won the race and a retry may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::EventStore(e) if e.is_conflict())
    }
}

impl From<ProductError> for DomainError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::Invalid(errors) => DomainError::Validation(errors),
            other => DomainError::Product(other),
        }
    }
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::Invalid(errors) => DomainError::Validation(errors),
            other => DomainError::Order(other),
        }
    }
}

impl From<AccountError> for DomainError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Invalid(errors) => DomainError::Validation(errors),
            AccountError::InvalidToken | AccountError::TokenExpired => {
                DomainError::Validation(ValidationErrors::single("token", e.to_string()))
            }
            other => DomainError::Account(other),
        }
    }
}

impl From<PurchaseError> for DomainError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::Invalid(errors) => DomainError::Validation(errors),
            other => DomainError::Purchase(other),
        }
    }
}

impl From<SettingsError> for DomainError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Invalid(errors) => DomainError::Validation(errors),
            other => DomainError::Settings(other),
        }
    }
}
