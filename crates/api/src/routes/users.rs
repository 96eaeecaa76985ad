//! Account registration and email verification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::Registration;
use domain::{Email, OrderId, Role, User, UserId};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    pub email: String,
    pub token: String,
}

/// Public view of an account; credentials and tokens stay server-side.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Option<UserId>,
    pub email: Option<Email>,
    pub name: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id(),
            email: user.email().cloned(),
            name: user.name().to_string(),
            role: user.role(),
            is_verified: user.is_verified(),
        }
    }
}

#[derive(Serialize)]
pub struct RegisteredResponse {
    pub user: UserResponse,
    pub linked_orders: Vec<OrderId>,
}

/// POST /users/register
#[tracing::instrument(skip(state, input), fields(email = %input.email))]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(input): ApiJson<Registration>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let registered = state.registrar.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            user: UserResponse::from(&registered.user),
            linked_orders: registered.linked_orders,
        }),
    ))
}

/// POST /users/verify
#[tracing::instrument(skip(state, request), fields(email = %request.email))]
pub async fn verify<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .registrar
        .verify_email(&request.email, &request.token)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}
