//! Account registration, including takeover of an existing guest record.

use chrono::{Duration, Utc};
use domain::account::{MIN_PASSWORD_LENGTH, NewUser, generate_token, hash_password};
use domain::command::stage;
use domain::ids::guest_stream_id;
use domain::{
    AccountService, Address, Aggregate, DomainError, Email, GuestUser, Order, OrderId,
    OrderService, Role, User, UserId, ValidationErrors,
};
use event_store::{EventStore, StreamWrite, Version};
use serde::Deserialize;

use crate::coordinator::MAX_ATTEMPTS;
use crate::error::{CheckoutError, Result};
use crate::notifications::{Notification, NotificationDispatcher};

pub const DEFAULT_VERIFICATION_TTL_HOURS: i64 = 24;

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("address", &self.address)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredUser {
    pub user: User,
    /// Guest orders now owned by the new account.
    pub linked_orders: Vec<OrderId>,
}

pub struct Registrar<S: EventStore + Clone> {
    store: S,
    accounts: AccountService<S>,
    orders: OrderService<S>,
    notifications: NotificationDispatcher,
    verification_ttl: Duration,
}

impl<S: EventStore + Clone> Registrar<S> {
    pub fn new(store: S, notifications: NotificationDispatcher) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
            notifications,
            verification_ttl: Duration::hours(DEFAULT_VERIFICATION_TTL_HOURS),
        }
    }

    pub fn with_verification_ttl(mut self, ttl: Duration) -> Self {
        self.verification_ttl = ttl;
        self
    }

    /// Creates an account.
    ///
    /// A live guest record for the same email is taken over in the same
    /// commit: its details fill in whatever the registration leaves blank,
    /// its orders move to the new account and the record stops accepting
    /// guest orders.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: Registration) -> Result<RegisteredUser> {
        let mut errors = ValidationErrors::new();
        let email = Email::parse(&input.email)
            .map_err(|e| errors.add("email", e.to_string()))
            .ok();
        errors.check(
            input.password.chars().count() < MIN_PASSWORD_LENGTH,
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
        errors.into_result()?;
        let Some(email) = email else {
            return Err(ValidationErrors::single("email", "is required").into());
        };

        if self.accounts.find_user(&email).await?.is_some() {
            return Err(email_taken());
        }
        let password_hash = hash_password(&input.password).map_err(DomainError::from)?;
        let token = generate_token();

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 && self.accounts.find_user(&email).await?.is_some() {
                return Err(email_taken());
            }
            match self.try_register(&email, &input, &password_hash, &token).await {
                Ok(registered) => {
                    metrics::counter!("users_registered_total").increment(1);
                    tracing::info!(
                        user_id = ?registered.user.user_id(),
                        linked = registered.linked_orders.len(),
                        "user registered"
                    );
                    self.notifications.dispatch(Notification::AccountVerification {
                        user: registered.user.clone(),
                        token,
                    });
                    return Ok(registered);
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(attempt, error = %e, "registration conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CheckoutError::Conflict(format!(
            "registration could not be committed after {MAX_ATTEMPTS} attempts"
        )))
    }

    async fn try_register(
        &self,
        email: &Email,
        input: &Registration,
        password_hash: &str,
        token: &str,
    ) -> Result<RegisteredUser> {
        let guest = self.accounts.guests().load(guest_stream_id(email)).await?;
        let defaults = guest.is_live().then_some(&guest);

        let name = non_blank(input.name.as_deref())
            .or_else(|| defaults.map(|g| g.name().to_string()))
            .unwrap_or_default();
        let phone = non_blank(input.phone.as_deref())
            .or_else(|| defaults.map(|g| g.phone().to_string()))
            .unwrap_or_default();
        let address = input
            .address
            .clone()
            .filter(|a| !a.is_blank())
            .or_else(|| defaults.map(|g| g.address().clone()).filter(|a| !a.is_blank()));

        let user_id = UserId::for_email(email);
        let user_events = User::default()
            .register(NewUser {
                email: email.clone(),
                name,
                phone,
                address,
                role: Role::User,
                password_hash: password_hash.to_string(),
                verification_token: token.to_string(),
                verification_expires_at: Utc::now() + self.verification_ttl,
            })
            .map_err(DomainError::from)?;

        let mut writes = vec![stage::<User>(user_id.into(), Version::initial(), &user_events)?];
        let mut linked_orders = Vec::new();
        if let Some(guest) = defaults {
            let (order_writes, linked) = self.link_guest_orders(guest, user_id).await?;
            writes.extend(order_writes);
            linked_orders = linked;

            let events = guest.supersede(user_id).map_err(DomainError::from)?;
            writes.push(stage::<GuestUser>(
                guest_stream_id(email),
                guest.version(),
                &events,
            )?);
        }

        self.store.append_streams(writes).await?;

        let mut user = User::default();
        let version = Version::new(user_events.len() as i64);
        user.apply_events(user_events);
        user.set_version(version);
        Ok(RegisteredUser {
            user,
            linked_orders,
        })
    }

    /// Re-points the guest's orders that still have no registered owner.
    async fn link_guest_orders(
        &self,
        guest: &GuestUser,
        user_id: UserId,
    ) -> Result<(Vec<StreamWrite>, Vec<OrderId>)> {
        let mut writes = Vec::new();
        let mut linked = Vec::new();
        for order_id in guest.order_ids() {
            let Some(order) = self.orders.handler().load_existing((*order_id).into()).await?
            else {
                continue;
            };
            if !eligible_for_linking(&order) {
                continue;
            }
            let events = order.link_to_user(user_id).map_err(DomainError::from)?;
            writes.push(stage::<Order>((*order_id).into(), order.version(), &events)?);
            linked.push(*order_id);
        }
        Ok((writes, linked))
    }

    pub async fn verify_email(&self, email: &str, token: &str) -> Result<User> {
        let email = Email::parse(email)
            .map_err(|e| ValidationErrors::single("email", e.to_string()))?;
        Ok(self.accounts.verify_email(&email, token).await?)
    }
}

fn eligible_for_linking(order: &Order) -> bool {
    !order.is_deleted() && (order.owner().is_none() || order.is_guest_order())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn email_taken() -> CheckoutError {
    CheckoutError::Conflict("email already registered".into())
}
