//! Projection and reporting errors.

use domain::{DomainError, ValidationErrors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Caller supplied an unusable report range.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
