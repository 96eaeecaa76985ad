//! Outbound notification sender trait and implementations.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::{Email, Order, OrderId, OrderStatus, User};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Sends customer and admin notifications.
///
/// Delivery is best-effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError>;

    async fn send_order_status_change(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotifyError>;

    async fn send_admin_new_order_alert(&self, order: &Order) -> Result<(), NotifyError>;

    async fn send_account_verification(&self, user: &User, token: &str) -> Result<(), NotifyError>;
}

fn recipient(order: &Order) -> Option<&Email> {
    order.shipping().map(|s| &s.email)
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier {
    admin_email: Option<String>,
}

impl LoggingNotifier {
    pub fn new(admin_email: Option<String>) -> Self {
        Self { admin_email }
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        let to = recipient(order).ok_or_else(|| NotifyError("order has no recipient".into()))?;
        tracing::info!(
            order_id = ?order.order_id(),
            %to,
            total = %order.total_price(),
            "order confirmation"
        );
        Ok(())
    }

    async fn send_order_status_change(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotifyError> {
        let to = recipient(order).ok_or_else(|| NotifyError("order has no recipient".into()))?;
        tracing::info!(
            order_id = ?order.order_id(),
            %to,
            from = %previous,
            status = %order.status(),
            "order status change"
        );
        Ok(())
    }

    async fn send_admin_new_order_alert(&self, order: &Order) -> Result<(), NotifyError> {
        let Some(admin) = &self.admin_email else {
            tracing::debug!("no admin alert address configured");
            return Ok(());
        };
        tracing::info!(
            order_id = ?order.order_id(),
            to = %admin,
            items = order.items_count(),
            total = %order.total_price(),
            "new order alert"
        );
        Ok(())
    }

    async fn send_account_verification(&self, user: &User, token: &str) -> Result<(), NotifyError> {
        let to = user
            .email()
            .ok_or_else(|| NotifyError("user has no email".into()))?;
        tracing::info!(%to, token_len = token.len(), "account verification");
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    OrderConfirmation { order_id: OrderId, to: Email },
    StatusChange { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    AdminAlert { order_id: OrderId },
    AccountVerification { to: Email, token: String },
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Sent>,
    fail_on_confirmation: bool,
    fail_on_status_change: bool,
    fail_on_admin_alert: bool,
    fail_on_verification: bool,
}

/// Records notifications in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    pub fn set_fail_on_confirmation(&self, fail: bool) {
        self.write().fail_on_confirmation = fail;
    }

    pub fn set_fail_on_status_change(&self, fail: bool) {
        self.write().fail_on_status_change = fail;
    }

    pub fn set_fail_on_admin_alert(&self, fail: bool) {
        self.write().fail_on_admin_alert = fail;
    }

    pub fn set_fail_on_verification(&self, fail: bool) {
        self.write().fail_on_verification = fail;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryNotifierState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, failing: bool, sent: Sent) -> Result<(), NotifyError> {
        if failing {
            return Err(NotifyError("mail server unavailable".into()));
        }
        self.write().sent.push(sent);
        Ok(())
    }
}

fn order_id(order: &Order) -> Result<OrderId, NotifyError> {
    order
        .order_id()
        .ok_or_else(|| NotifyError("order was never placed".into()))
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        let failing = self.write().fail_on_confirmation;
        let to = recipient(order)
            .cloned()
            .ok_or_else(|| NotifyError("order has no recipient".into()))?;
        self.record(
            failing,
            Sent::OrderConfirmation {
                order_id: order_id(order)?,
                to,
            },
        )
    }

    async fn send_order_status_change(
        &self,
        order: &Order,
        previous: OrderStatus,
    ) -> Result<(), NotifyError> {
        let failing = self.write().fail_on_status_change;
        self.record(
            failing,
            Sent::StatusChange {
                order_id: order_id(order)?,
                from: previous,
                to: order.status(),
            },
        )
    }

    async fn send_admin_new_order_alert(&self, order: &Order) -> Result<(), NotifyError> {
        let failing = self.write().fail_on_admin_alert;
        self.record(
            failing,
            Sent::AdminAlert {
                order_id: order_id(order)?,
            },
        )
    }

    async fn send_account_verification(&self, user: &User, token: &str) -> Result<(), NotifyError> {
        let failing = self.write().fail_on_verification;
        let to = user
            .email()
            .cloned()
            .ok_or_else(|| NotifyError("user has no email".into()))?;
        self.record(
            failing,
            Sent::AccountVerification {
                to,
                token: token.to_string(),
            },
        )
    }
}
