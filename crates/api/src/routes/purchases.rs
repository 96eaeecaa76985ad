//! Inventory purchase ledger endpoints. Admin only.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{InventoryPurchase, Money, NewPurchase, PurchaseAmendment, PurchaseId, ValidationErrors};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, Authenticated, parse_id};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PurchaseRange {
    /// Both ends or neither; an open end is a client error.
    fn bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ValidationErrors> {
        match (self.start, self.end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) if start <= end => Ok(Some((start, end))),
            (Some(_), Some(_)) => Err(ValidationErrors::single("start", "must not be after end")),
            (None, Some(_)) => Err(ValidationErrors::single("start", "is required with end")),
            (Some(_), None) => Err(ValidationErrors::single("end", "is required with start")),
        }
    }
}

#[derive(Serialize)]
pub struct PurchaseResponse {
    pub id: Option<PurchaseId>,
    pub amount: Money,
    pub purchased_at: Option<DateTime<Utc>>,
    pub supplier: String,
    pub note: String,
}

impl From<&InventoryPurchase> for PurchaseResponse {
    fn from(purchase: &InventoryPurchase) -> Self {
        Self {
            id: purchase.purchase_id(),
            amount: purchase.amount(),
            purchased_at: purchase.purchased_at(),
            supplier: purchase.supplier().to_string(),
            note: purchase.note().to_string(),
        }
    }
}

/// POST /purchases
#[tracing::instrument(skip(state))]
pub async fn record<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    ApiJson(input): ApiJson<NewPurchase>,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    caller.require_admin()?;
    let purchase = state.purchases.record(input).await?;
    Ok((StatusCode::CREATED, Json(PurchaseResponse::from(&purchase))))
}

/// GET /purchases: newest first, optionally within `start..=end`.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Query(range): Query<PurchaseRange>,
) -> Result<Json<Vec<PurchaseResponse>>, ApiError> {
    caller.require_admin()?;
    let purchases = state.purchases.list(range.bounds()?).await?;
    Ok(Json(purchases.iter().map(PurchaseResponse::from).collect()))
}

/// PUT /purchases/{id}
#[tracing::instrument(skip(state))]
pub async fn amend<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<PurchaseAmendment>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    caller.require_admin()?;
    let result = state.purchases.amend(parse_id(&id)?, change).await?;
    Ok(Json(PurchaseResponse::from(&result.aggregate)))
}

/// DELETE /purchases/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    state.purchases.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
