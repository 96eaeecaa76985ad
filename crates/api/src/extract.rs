//! Request extractors.
//!
//! Authentication happens upstream: the gateway forwards the signed-in
//! user's id in `x-user-id` and their role in `x-user-role`.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use checkout::Caller;
use domain::{Role, UserId};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn caller_from_headers(headers: &HeaderMap) -> Result<Option<Caller>, ApiError> {
    let Some(raw_id) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let user_id: UserId = raw_id
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid {USER_ID_HEADER} header")))?;

    let role = match headers.get(USER_ROLE_HEADER).map(|v| v.to_str()) {
        None => Role::User,
        Some(Ok(role)) if role.trim().eq_ignore_ascii_case("admin") => Role::Admin,
        Some(Ok(role)) if role.trim().eq_ignore_ascii_case("user") => Role::User,
        Some(_) => {
            return Err(ApiError::BadRequest(format!(
                "invalid {USER_ROLE_HEADER} header"
            )));
        }
    };
    Ok(Some(Caller { user_id, role }))
}

/// A signed-in caller; requests without one get 401.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)?
            .map(Authenticated)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// The caller if there is one; guests check out anonymously.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthenticated(pub Option<Caller>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).map(MaybeAuthenticated)
    }
}

/// [`axum::Json`] whose rejections use the API error body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Parses an id taken from the path.
pub fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid id: {raw}")))
}
