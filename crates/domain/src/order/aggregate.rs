//! Order aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::contact::ShippingInfo;
use crate::costing::OrderTotals;
use crate::ids::{OrderId, UserId};
use crate::money::Money;
use crate::validation::ValidationErrors;

use super::{
    OrderError, OrderEvent, OrderLine, OrderStatus, PaymentInfo, PaymentMethod, PaymentStatus,
    events::{OrderPlacedData, OrderStatusChangedData, PaymentStatusChangedData},
};

/// Everything needed to place an order once the cart has been checked
/// against the catalog.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub owner: Option<UserId>,
    pub is_guest_order: bool,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub delivery_price: Money,
}

/// A placed order.
///
/// Lines, costs and the shipping snapshot never change after placement.
/// Only status, payment, delivery price, ownership and deletion move.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    #[serde(default)]
    version: Version,
    owner: Option<UserId>,
    is_guest_order: bool,
    lines: Vec<OrderLine>,
    shipping: Option<ShippingInfo>,
    payment: PaymentInfo,
    items_price: Money,
    delivery_price: Money,
    total_price: Money,
    total_cost: Money,
    total_profit: Money,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    placed_at: Option<DateTime<Utc>>,
    deleted: bool,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
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

    fn apply(&mut self, event: OrderEvent) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(data),
            OrderEvent::OrderStatusChanged(OrderStatusChangedData { to, changed_at, .. }) => {
                self.status = to;
                if to == OrderStatus::Delivered {
                    self.delivered_at = Some(changed_at);
                }
            }
            OrderEvent::PaymentStatusChanged(PaymentStatusChangedData { to, changed_at, .. }) => {
                self.payment.status = to;
                if to == PaymentStatus::Paid {
                    self.payment.paid_at = Some(changed_at);
                }
            }
            OrderEvent::DeliveryPriceChanged(data) => {
                self.delivery_price = data.delivery_price;
                self.total_price = data.total_price;
            }
            OrderEvent::OrderLinkedToUser(data) => {
                self.owner = Some(data.user_id);
                self.is_guest_order = false;
            }
            OrderEvent::OrderDeleted(_) => self.deleted = true,
        }
    }
}

// Queries
impl Order {
    pub fn order_id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn is_guest_order(&self) -> bool {
        self.is_guest_order
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn shipping(&self) -> Option<&ShippingInfo> {
        self.shipping.as_ref()
    }

    pub fn payment(&self) -> &PaymentInfo {
        &self.payment
    }

    pub fn items_price(&self) -> Money {
        self.items_price
    }

    pub fn delivery_price(&self) -> Money {
        self.delivery_price
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }

    pub fn total_profit(&self) -> Money {
        self.total_profit
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn items_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// True when `user` owns the order.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }
}

// Commands
impl Order {
    pub fn place(&self, order_id: OrderId, input: PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        let mut errors = ValidationErrors::new();
        errors.check(input.lines.is_empty(), "items", "must not be empty");
        for (k, line) in input.lines.iter().enumerate() {
            errors.check(line.quantity == 0, format!("items[{k}].quantity"), "must be at least 1");
        }
        errors.check(
            input.delivery_price.is_negative(),
            "delivery_price",
            "must not be negative",
        );
        errors.into_result().map_err(OrderError::Invalid)?;

        let totals = OrderTotals::checked_from_lines(&input.lines).map_err(|k| {
            OrderError::Invalid(ValidationErrors::single(
                format!("items[{k}].quantity"),
                "order amount is too large",
            ))
        })?;
        let total_price = totals
            .items_price
            .checked_add(input.delivery_price)
            .ok_or_else(too_large_delivery_price)?;
        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            owner: input.owner,
            is_guest_order: input.is_guest_order,
            lines: input.lines,
            shipping: input.shipping,
            payment_method: input.payment_method,
            items_price: totals.items_price,
            delivery_price: input.delivery_price,
            total_price,
            total_cost: totals.total_cost,
            total_profit: totals.total_profit,
            placed_at: Utc::now(),
        })])
    }

    /// Moves the order along the fulfillment graph. Same status is a no-op.
    pub fn change_status(&self, next: OrderStatus) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if next == self.status {
            return Ok(vec![]);
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        Ok(vec![OrderEvent::status_changed(self.status, next)])
    }

    pub fn change_payment_status(&self, next: PaymentStatus) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if next == self.payment.status {
            return Ok(vec![]);
        }
        Ok(vec![OrderEvent::payment_status_changed(
            self.payment.status,
            next,
        )])
    }

    /// Replaces the delivery price and recomputes the total from the stored
    /// items price.
    pub fn change_delivery_price(&self, delivery_price: Money) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if delivery_price.is_negative() {
            return Err(OrderError::Invalid(ValidationErrors::single(
                "delivery_price",
                "must not be negative",
            )));
        }
        if delivery_price == self.delivery_price {
            return Ok(vec![]);
        }
        let total_price = self
            .items_price
            .checked_add(delivery_price)
            .ok_or_else(too_large_delivery_price)?;
        Ok(vec![OrderEvent::delivery_price_changed(
            delivery_price,
            total_price,
        )])
    }

    /// Re-points a guest order at the account that registered its email.
    pub fn link_to_user(&self, user_id: UserId) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        if self.owner.is_some() && !self.is_guest_order {
            return Err(OrderError::NotGuestOrder);
        }
        Ok(vec![OrderEvent::linked_to_user(user_id)])
    }

    /// Tombstones the order. Stock is not restored.
    pub fn delete(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_live()?;
        Ok(vec![OrderEvent::deleted()])
    }

    fn ensure_live(&self) -> Result<(), OrderError> {
        match self.id {
            None => Err(OrderError::NotPlaced),
            Some(_) if self.deleted => Err(OrderError::Deleted),
            Some(_) => Ok(()),
        }
    }

    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.owner = data.owner;
        self.is_guest_order = data.is_guest_order;
        self.lines = data.lines;
        self.shipping = Some(data.shipping);
        self.payment = PaymentInfo {
            method: data.payment_method,
            ..PaymentInfo::default()
        };
        self.items_price = data.items_price;
        self.delivery_price = data.delivery_price;
        self.total_price = data.total_price;
        self.total_cost = data.total_cost;
        self.total_profit = data.total_profit;
        self.status = OrderStatus::Pending;
        self.placed_at = Some(data.placed_at);
    }
}

fn too_large_delivery_price() -> OrderError {
    OrderError::Invalid(ValidationErrors::single(
        "delivery_price",
        "order total is too large",
    ))
}
