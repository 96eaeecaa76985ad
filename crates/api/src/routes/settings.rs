//! Store settings endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::SettingsUpdate;
use domain::Money;
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, Authenticated};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeliveryPriceResponse {
    pub default_delivery_price: Money,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryPriceRequest {
    pub default_delivery_price: Money,
    /// Also overwrite the delivery price of every existing order.
    #[serde(default)]
    pub apply_to_existing: bool,
}

/// GET /settings/delivery-price
pub async fn get_delivery_price<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<DeliveryPriceResponse>, ApiError> {
    let default_delivery_price = state.settings.default_delivery_price().await?;
    Ok(Json(DeliveryPriceResponse {
        default_delivery_price,
    }))
}

/// PUT /settings/delivery-price
#[tracing::instrument(skip(state))]
pub async fn set_delivery_price<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    ApiJson(request): ApiJson<DeliveryPriceRequest>,
) -> Result<Json<SettingsUpdate>, ApiError> {
    caller.require_admin()?;
    let update = state
        .settings
        .set_default_delivery_price(request.default_delivery_price, request.apply_to_existing)
        .await?;
    Ok(Json(update))
}
