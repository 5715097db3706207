//! Bearer token verification. Verified claims are attached to the request.

use crate::error::ApiError;
use crate::jwt::Claims;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Authorization header is required"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid Authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use the Bearer scheme"))?;
    Ok(token)
}

pub async fn parse_token(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(req.headers())?;
        state.jwt.parse_claims(token).map_err(|e| {
            tracing::debug!(error = %e, "token verification failed");
            ApiError::from(e)
        })?
    };
    tracing::trace!(user_id = %claims.user_id, company_id = %claims.company_id, "token accepted");
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims attached by [`parse_token`]; rejects with 401 when the middleware did not run or failed.
#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("no verified token on request"))
    }
}
