//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{BulkOutcome, CostPriceUpdate, Money, NewProduct, Product, ProductId};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{ApiJson, Authenticated, MaybeAuthenticated, parse_id};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestockRequest {
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: Option<ProductId>,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    /// Shown to admins only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Money>,
    pub stock: u32,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub is_hidden: bool,
    pub featured: bool,
    pub related: Vec<ProductId>,
    pub listed_at: Option<DateTime<Utc>>,
}

impl ProductResponse {
    fn new(product: &Product, with_cost: bool) -> Self {
        Self {
            id: product.product_id(),
            name: product.name().to_string(),
            description: product.description().to_string(),
            category: product.category().to_string(),
            price: product.price(),
            cost_price: with_cost.then(|| product.cost_price()),
            stock: product.stock(),
            sizes: product.sizes().to_vec(),
            colors: product.colors().to_vec(),
            is_hidden: product.is_hidden(),
            featured: product.featured(),
            related: product.related().to_vec(),
            listed_at: product.listed_at(),
        }
    }
}

/// POST /products
#[tracing::instrument(skip(state, input))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    ApiJson(input): ApiJson<NewProduct>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    caller.require_admin()?;
    let product = state.catalog.list_product(input).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::new(&product, true))))
}

/// GET /products: hidden products and cost prices are for admins only.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    MaybeAuthenticated(caller): MaybeAuthenticated,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let is_admin = caller.is_some_and(|c| c.is_admin());
    let products = state
        .catalog
        .list_products()
        .await?
        .iter()
        .filter(|p| is_admin || !p.is_hidden())
        .map(|p| ProductResponse::new(p, is_admin))
        .collect();
    Ok(Json(products))
}

/// POST /products/{id}/restock
#[tracing::instrument(skip(state))]
pub async fn restock<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RestockRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    caller.require_admin()?;
    let result = state
        .catalog
        .restock(parse_id(&id)?, request.quantity)
        .await?;
    Ok(Json(ProductResponse::new(&result.aggregate, true)))
}

/// POST /products/cost-prices: per-product results, never all-or-nothing.
#[tracing::instrument(skip(state, updates))]
pub async fn update_cost_prices<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    ApiJson(updates): ApiJson<Vec<CostPriceUpdate>>,
) -> Result<Json<BulkOutcome<ProductId>>, ApiError> {
    caller.require_admin()?;
    Ok(Json(state.catalog.bulk_update_cost_prices(updates).await))
}
