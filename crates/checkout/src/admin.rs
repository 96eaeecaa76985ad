//! Administrative reads and changes to placed orders.

use domain::command::stage;
use domain::{
    Aggregate, DomainError, Money, Order, OrderId, OrderService, OrderStatus, PaymentStatus,
};
use event_store::{EventStore, Version};
use serde::Deserialize;

use crate::caller::Caller;
use crate::coordinator::MAX_ATTEMPTS;
use crate::error::{CheckoutError, Result};
use crate::notifications::{Notification, NotificationDispatcher};

/// Fields an admin may change on an order. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderUpdate {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub delivery_price: Option<Money>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none() && self.delivery_price.is_none()
    }
}

/// An update as committed: the order after it, and whether its status moved.
struct Applied {
    order: Order,
    previous: OrderStatus,
    status_changed: bool,
}

pub struct OrderAdmin<S: EventStore + Clone> {
    store: S,
    orders: OrderService<S>,
    notifications: NotificationDispatcher,
}

impl<S: EventStore + Clone> OrderAdmin<S> {
    pub fn new(store: S, notifications: NotificationDispatcher) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            store,
            notifications,
        }
    }

    /// Admins see every order; other callers only their own.
    pub async fn get_order(&self, caller: &Caller, order_id: OrderId) -> Result<Order> {
        let order = self.orders.get_order(order_id).await?;
        if caller.is_admin() || order.is_owned_by(caller.user_id) {
            Ok(order)
        } else {
            Err(CheckoutError::Authorization(
                "order belongs to another customer".into(),
            ))
        }
    }

    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        caller.require_admin()?;
        Ok(self.orders.list_orders().await?)
    }

    pub async fn my_orders(&self, caller: &Caller) -> Result<Vec<Order>> {
        Ok(self.orders.orders_owned_by(caller.user_id).await?)
    }

    /// Applies an update as one commit: either every part lands or none
    /// does. A concurrent change to the order triggers a fresh attempt.
    ///
    /// A status change that the customer should hear about is queued for
    /// notification; delivery failures never fail the update.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
        update: OrderUpdate,
    ) -> Result<Order> {
        caller.require_admin()?;
        if update.is_empty() {
            return Ok(self.orders.get_order(order_id).await?);
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_update(order_id, &update).await {
                Ok(applied) => {
                    let order = applied.order;
                    if applied.status_changed {
                        let status = order.status();
                        if status.notifies_customer() {
                            self.notifications.dispatch(Notification::StatusChanged {
                                order: order.clone(),
                                previous: applied.previous,
                            });
                        }
                        metrics::counter!("order_status_changes_total", "to" => status.as_str())
                            .increment(1);
                    }
                    tracing::info!(%order_id, status = %order.status(), "order updated");
                    return Ok(order);
                }
                Err(e) if e.is_conflict() => {
                    tracing::warn!(attempt, error = %e, "order update conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CheckoutError::Conflict(format!(
            "order update could not be committed after {MAX_ATTEMPTS} attempts"
        )))
    }

    async fn try_update(&self, order_id: OrderId, update: &OrderUpdate) -> Result<Applied> {
        let current = self.orders.get_order(order_id).await?;
        let previous = current.status();
        let mut order = current.clone();
        let mut events = Vec::new();
        let mut status_changed = false;

        if let Some(status) = update.status {
            let changed = order.change_status(status).map_err(DomainError::from)?;
            status_changed = !changed.is_empty();
            order.apply_events(changed.iter().cloned());
            events.extend(changed);
        }
        if let Some(payment_status) = update.payment_status {
            let changed = order
                .change_payment_status(payment_status)
                .map_err(DomainError::from)?;
            order.apply_events(changed.iter().cloned());
            events.extend(changed);
        }
        if let Some(price) = update.delivery_price {
            let changed = order
                .change_delivery_price(price)
                .map_err(DomainError::from)?;
            order.apply_events(changed.iter().cloned());
            events.extend(changed);
        }

        if !events.is_empty() {
            let write = stage::<Order>(order_id.into(), current.version(), &events)?;
            self.store.append_streams(vec![write]).await?;
            order.set_version(Version::new(
                current.version().as_i64() + events.len() as i64,
            ));
        }

        Ok(Applied {
            order,
            previous,
            status_changed,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, caller: &Caller, order_id: OrderId) -> Result<()> {
        caller.require_admin()?;
        self.orders.delete(order_id).await?;
        tracing::info!(%order_id, "order deleted");
        Ok(())
    }
}
