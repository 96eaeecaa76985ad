//! Account lookups and email verification.

use chrono::Utc;
use event_store::EventStore;

use crate::command::CommandHandler;
use crate::contact::Email;
use crate::error::DomainError;
use crate::ids::{UserId, guest_stream_id};

use super::{GuestUser, User};

pub struct AccountService<S: EventStore + Clone> {
    users: CommandHandler<S, User>,
    guests: CommandHandler<S, GuestUser>,
}

impl<S: EventStore + Clone> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self {
            users: CommandHandler::new(store.clone()),
            guests: CommandHandler::new(store),
        }
    }

    pub fn users(&self) -> &CommandHandler<S, User> {
        &self.users
    }

    pub fn guests(&self) -> &CommandHandler<S, GuestUser> {
        &self.guests
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, DomainError> {
        self.users
            .load_existing(user_id.into())
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }

    pub async fn find_user(&self, email: &Email) -> Result<Option<User>, DomainError> {
        self.users
            .load_existing(UserId::for_email(email).into())
            .await
    }

    /// The live guest record for `email`, if any.
    pub async fn find_guest(&self, email: &Email) -> Result<Option<GuestUser>, DomainError> {
        let guest = self.guests.load(guest_stream_id(email)).await?;
        Ok(guest.is_live().then_some(guest))
    }

    #[tracing::instrument(skip(self, token), fields(email = %email))]
    pub async fn verify_email(&self, email: &Email, token: &str) -> Result<User, DomainError> {
        let user_id = UserId::for_email(email);
        self.get_user(user_id).await?;
        let result = self
            .users
            .execute(user_id.into(), |user| user.verify(token, Utc::now()))
            .await?;

        if !result.events.is_empty() {
            tracing::info!(%user_id, "email verified");
        }
        Ok(result.aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewUser, Role};
    use chrono::Duration;
    use event_store::InMemoryEventStore;

    #[tokio::test]
    async fn verify_email_with_issued_token() {
        let accounts = AccountService::new(InMemoryEventStore::new());
        let email = Email::parse("neo@example.com").unwrap();
        let id = UserId::for_email(&email);
        accounts
            .users()
            .execute(id.into(), |user| {
                user.register(NewUser {
                    email: email.clone(),
                    name: "Neo".into(),
                    phone: String::new(),
                    address: None,
                    role: Role::User,
                    password_hash: "h".into(),
                    verification_token: "abc".into(),
                    verification_expires_at: Utc::now() + Duration::hours(24),
                })
            })
            .await
            .unwrap();

        let wrong = accounts.verify_email(&email, "xyz").await;
        assert!(matches!(wrong, Err(DomainError::Validation(_))));

        let user = accounts.verify_email(&email, "abc").await.unwrap();
        assert!(user.is_verified());
        assert!(accounts.find_user(&email).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_email_has_no_account_or_guest() {
        let accounts = AccountService::new(InMemoryEventStore::new());
        let email = Email::parse("nobody@example.com").unwrap();

        assert!(accounts.find_user(&email).await.unwrap().is_none());
        assert!(accounts.find_guest(&email).await.unwrap().is_none());
        assert!(matches!(
            accounts.verify_email(&email, "t").await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
