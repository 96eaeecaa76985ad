//! Order listing for the back-office and for customers' own order pages.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Aggregate, Email, Money, Order, OrderEvent, OrderId, OrderStatus, PaymentStatus, UserId};
use event_store::EventEnvelope;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One row of the order book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub owner: Option<UserId>,
    pub email: Email,
    pub customer_name: String,
    pub is_guest_order: bool,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub items_count: u64,
    pub items_price: Money,
    pub delivery_price: Money,
    pub total_price: Money,
    pub total_profit: Money,
    pub placed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OrderSummary {
    /// Row for an order loaded directly from its stream.
    pub fn from_order(order: &Order) -> Option<Self> {
        let shipping = order.shipping()?;
        Some(Self {
            order_id: order.order_id()?,
            owner: order.owner(),
            email: shipping.email.clone(),
            customer_name: shipping.name.clone(),
            is_guest_order: order.is_guest_order(),
            status: order.status(),
            payment_status: order.payment().status,
            items_count: order.items_count(),
            items_price: order.items_price(),
            delivery_price: order.delivery_price(),
            total_price: order.total_price(),
            total_profit: order.total_profit(),
            placed_at: order.placed_at()?,
            delivered_at: order.delivered_at(),
        })
    }
}

/// Criteria for listing orders; unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn owned_by(user_id: UserId) -> Self {
        Self {
            owner: Some(user_id),
            ..Default::default()
        }
    }

    fn matches(&self, summary: &OrderSummary) -> bool {
        self.owner.is_none_or(|owner| summary.owner == Some(owner))
            && self
                .email
                .as_deref()
                .is_none_or(|email| summary.email.as_str() == email.trim().to_lowercase())
            && self.status.is_none_or(|status| summary.status == status)
    }
}

#[derive(Default)]
struct OrderBookState {
    orders: HashMap<OrderId, Order>,
    position: ProjectionPosition,
}

/// Live orders, folded from `Order` events. Deleted orders drop out.
#[derive(Clone, Default)]
pub struct OrderBookView {
    state: Arc<RwLock<OrderBookState>>,
}

impl OrderBookView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: OrderId) -> Option<OrderSummary> {
        let state = self.state.read().await;
        state.orders.get(&order_id).and_then(OrderSummary::from_order)
    }

    /// Matching orders, newest first.
    pub async fn query(&self, filter: &OrderFilter) -> Vec<OrderSummary> {
        let state = self.state.read().await;
        let mut rows: Vec<_> = state
            .orders
            .values()
            .filter_map(OrderSummary::from_order)
            .filter(|row| filter.matches(row))
            .collect();
        rows.sort_by(|a, b| {
            b.placed_at
                .cmp(&a.placed_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        rows
    }
}

#[async_trait]
impl Projection for OrderBookView {
    fn name(&self) -> &'static str {
        "OrderBookView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut state = self.state.write().await;
        state.position = state.position.advance();
        if event.aggregate_type != Order::aggregate_type() {
            return Ok(());
        }

        let order_event: OrderEvent = event.decode()?;
        let order_id = OrderId::from(event.aggregate_id);
        match order_event {
            OrderEvent::OrderDeleted(_) => {
                state.orders.remove(&order_id);
            }
            placed @ OrderEvent::OrderPlaced(_) => {
                let mut order = Order::default();
                order.apply(placed);
                order.set_version(event.version);
                state.orders.insert(order_id, order);
            }
            other => {
                if let Some(order) = state.orders.get_mut(&order_id) {
                    order.apply(other);
                    order.set_version(event.version);
                }
            }
        }
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = OrderBookState::default();
        Ok(())
    }
}

impl ReadModel for OrderBookView {
    fn name(&self) -> &'static str {
        "OrderBookView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.orders.len()).unwrap_or(0)
    }
}
