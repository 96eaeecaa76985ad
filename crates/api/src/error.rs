//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, FieldError, ValidationErrors};
use projections::ProjectionError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Checkout(CheckoutError::Validation(errors))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
                Vec::new(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Domain(err) => checkout_error_to_response(err.into()),
            ApiError::Projection(err) => projection_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message, "fields": fields });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String, Vec<FieldError>) {
    let message = err.to_string();
    match err {
        CheckoutError::Validation(errors) => {
            (StatusCode::BAD_REQUEST, message, errors.fields().to_vec())
        }
        CheckoutError::InsufficientStock { .. } | CheckoutError::VariantRequired { .. } => {
            (StatusCode::BAD_REQUEST, message, Vec::new())
        }
        CheckoutError::ProductNotFound(_) | CheckoutError::NotFound(_) => {
            (StatusCode::NOT_FOUND, message, Vec::new())
        }
        CheckoutError::Conflict(_) => (StatusCode::CONFLICT, message, Vec::new()),
        CheckoutError::Authorization(_) => (StatusCode::FORBIDDEN, message, Vec::new()),
        CheckoutError::Domain(
            DomainError::Product(_)
            | DomainError::Order(_)
            | DomainError::Account(_)
            | DomainError::Purchase(_)
            | DomainError::Settings(_),
        ) => (StatusCode::BAD_REQUEST, message, Vec::new()),
        CheckoutError::Domain(_) | CheckoutError::EventStore(_) => {
            tracing::error!(error = %message, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
        }
    }
}

fn projection_error_to_response(err: ProjectionError) -> (StatusCode, String, Vec<FieldError>) {
    match err {
        ProjectionError::Validation(errors) => checkout_error_to_response(errors.into()),
        ProjectionError::Domain(err) => checkout_error_to_response(err.into()),
        other => {
            tracing::error!(error = %other, "projection failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                other.to_string(),
                Vec::new(),
            )
        }
    }
}
