//! Checkout and order management endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::{CartSubmission, OrderUpdate};
use domain::order::PaymentInfo;
use domain::{Money, Order, OrderId, OrderLine, OrderStatus, ShippingInfo, UserId};
use event_store::EventStore;
use projections::{OrderFilter, OrderSummary};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::{ApiJson, Authenticated, MaybeAuthenticated, parse_id};
use crate::state::AppState;

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: Option<OrderId>,
    pub owner: Option<UserId>,
    pub is_guest_order: bool,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub lines: Vec<OrderLine>,
    pub shipping: Option<ShippingInfo>,
    pub items_price: Money,
    pub delivery_price: Money,
    pub total_price: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub placed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.order_id(),
            owner: order.owner(),
            is_guest_order: order.is_guest_order(),
            status: order.status(),
            payment: order.payment().clone(),
            lines: order.lines().to_vec(),
            shipping: order.shipping().cloned(),
            items_price: order.items_price(),
            delivery_price: order.delivery_price(),
            total_price: order.total_price(),
            total_cost: order.total_cost(),
            total_profit: order.total_profit(),
            placed_at: order.placed_at(),
            delivered_at: order.delivered_at(),
        }
    }
}

// -- Handlers --

/// POST /orders: check out a cart, signed in or as a guest.
#[tracing::instrument(skip(state, submission))]
pub async fn place<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    ApiJson(submission): ApiJson<CartSubmission>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let order = state
        .checkout
        .place_order(submission, caller.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: the admin order book, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    caller.require_admin()?;
    state.processor.run_catch_up().await?;
    Ok(Json(state.order_book.query(&filter).await))
}

/// GET /orders/mine: the caller's own orders.
#[tracing::instrument(skip(state))]
pub async fn mine<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.my_orders(&caller).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.get_order(&caller, parse_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// PATCH /orders/{id}: admin change of status, payment status or delivery price.
#[tracing::instrument(skip(state))]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<OrderUpdate>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .orders
        .update_order(&caller, parse_id(&id)?, update)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /orders/{id}: tombstones the order; stock is not restored.
#[tracing::instrument(skip(state))]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orders.delete_order(&caller, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
