//! Registered accounts.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::contact::{Address, Email};
use crate::ids::UserId;
use crate::validation::ValidationErrors;

use super::AccountError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// A registration whose password has already been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub address: Option<Address>,
    pub role: Role,
    pub password_hash: String,
    pub verification_token: String,
    pub verification_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    UserRegistered(UserRegisteredData),
    UserVerified(UserVerifiedData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => "UserRegistered",
            UserEvent::UserVerified(_) => "UserVerified",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredData {
    pub user_id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: String,
    pub address: Option<Address>,
    pub role: Role,
    pub password_hash: String,
    pub verification_token: String,
    pub verification_expires_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVerifiedData {
    pub verified_at: DateTime<Utc>,
}

/// A registered account. Its id is derived from the email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    id: Option<UserId>,
    #[serde(default)]
    version: Version,
    email: Option<Email>,
    name: String,
    phone: String,
    address: Option<Address>,
    role: Role,
    password_hash: String,
    verification_token: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    registered_at: Option<DateTime<Utc>>,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(Into::into)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: UserEvent) {
        match event {
            UserEvent::UserRegistered(data) => {
                self.id = Some(data.user_id);
                self.email = Some(data.email);
                self.name = data.name;
                self.phone = data.phone;
                self.address = data.address;
                self.role = data.role;
                self.password_hash = data.password_hash;
                self.verification_token = Some(data.verification_token);
                self.verification_expires_at = Some(data.verification_expires_at);
                self.registered_at = Some(data.registered_at);
            }
            UserEvent::UserVerified(data) => {
                self.verified_at = Some(data.verified_at);
                self.verification_token = None;
                self.verification_expires_at = None;
            }
        }
    }
}

impl User {
    pub fn user_id(&self) -> Option<UserId> {
        self.id
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.registered_at
    }

    pub fn register(&self, input: NewUser) -> Result<Vec<UserEvent>, AccountError> {
        if self.id.is_some() {
            return Err(AccountError::AlreadyRegistered);
        }
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AccountError::Invalid(ValidationErrors::single(
                "name",
                "is required",
            )));
        }

        Ok(vec![UserEvent::UserRegistered(UserRegisteredData {
            user_id: UserId::for_email(&input.email),
            email: input.email,
            name,
            phone: input.phone,
            address: input.address,
            role: input.role,
            password_hash: input.password_hash,
            verification_token: input.verification_token,
            verification_expires_at: input.verification_expires_at,
            registered_at: Utc::now(),
        })])
    }

    /// Confirms the email address. Repeating it once verified is a no-op.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Vec<UserEvent>, AccountError> {
        if self.id.is_none() {
            return Err(AccountError::NotRegistered);
        }
        if self.is_verified() {
            return Ok(vec![]);
        }
        if self.verification_token.as_deref() != Some(token) {
            return Err(AccountError::InvalidToken);
        }
        if self.verification_expires_at.is_some_and(|expires| now > expires) {
            return Err(AccountError::TokenExpired);
        }
        Ok(vec![UserEvent::UserVerified(UserVerifiedData { verified_at: now })])
    }
}
