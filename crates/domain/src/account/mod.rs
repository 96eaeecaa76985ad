//! Registered users, guest buyers and their credentials.

mod credentials;
mod guest;
mod service;
mod user;

pub use credentials::{
    MIN_PASSWORD_LENGTH, TOKEN_LENGTH, generate_token, hash_password, verify_password,
};
pub use guest::{GuestCreatedData, GuestEvent, GuestOrderRecordedData, GuestSupersededData, GuestUser};
pub use service::AccountService;
pub use user::{NewUser, Role, User, UserEvent, UserRegisteredData, UserVerifiedData};

use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("An account already exists for this email")]
    AlreadyRegistered,

    #[error("No account exists for this email")]
    NotRegistered,

    #[error("Verification token is invalid")]
    InvalidToken,

    #[error("Verification token has expired")]
    TokenExpired,

    #[error("Password could not be hashed")]
    PasswordHash,

    #[error("Guest record already exists")]
    GuestExists,

    #[error("No live guest record for this email")]
    GuestNotFound,

    #[error("{0}")]
    Invalid(ValidationErrors),
}
