//! Order domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::contact::ShippingInfo;
use crate::ids::{OrderId, UserId};
use crate::money::Money;

use super::{OrderLine, OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order accepted with its lines, costs and totals frozen.
    OrderPlaced(OrderPlacedData),
    OrderStatusChanged(OrderStatusChangedData),
    PaymentStatusChanged(PaymentStatusChangedData),
    DeliveryPriceChanged(DeliveryPriceChangedData),
    /// A guest order now belongs to the account registered under its email.
    OrderLinkedToUser(OrderLinkedToUserData),
    OrderDeleted(OrderDeletedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            OrderEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
            OrderEvent::DeliveryPriceChanged(_) => "DeliveryPriceChanged",
            OrderEvent::OrderLinkedToUser(_) => "OrderLinkedToUser",
            OrderEvent::OrderDeleted(_) => "OrderDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub owner: Option<UserId>,
    pub is_guest_order: bool,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub items_price: Money,
    pub delivery_price: Money,
    pub total_price: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPriceChangedData {
    pub delivery_price: Money,
    pub total_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLinkedToUserData {
    pub user_id: UserId,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeletedData {
    pub deleted_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn status_changed(from: OrderStatus, to: OrderStatus) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            from,
            to,
            changed_at: Utc::now(),
        })
    }

    pub fn payment_status_changed(from: PaymentStatus, to: PaymentStatus) -> Self {
        OrderEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from,
            to,
            changed_at: Utc::now(),
        })
    }

    pub fn delivery_price_changed(delivery_price: Money, total_price: Money) -> Self {
        OrderEvent::DeliveryPriceChanged(DeliveryPriceChangedData {
            delivery_price,
            total_price,
        })
    }

    pub fn linked_to_user(user_id: UserId) -> Self {
        OrderEvent::OrderLinkedToUser(OrderLinkedToUserData {
            user_id,
            linked_at: Utc::now(),
        })
    }

    pub fn deleted() -> Self {
        OrderEvent::OrderDeleted(OrderDeletedData {
            deleted_at: Utc::now(),
        })
    }
}
