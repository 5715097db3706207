//! Select the tenant database for the request from the token's company id.

use crate::error::ApiError;
use crate::jwt::Claims;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;

/// The tenant's pool, attached by [`select_tenant_db`].
#[derive(Clone, Debug)]
pub struct TenantDb {
    pub tenant_id: String,
    pub pool: PgPool,
}

/// Requires [`Claims`] on the request (run after `parse_token`).
pub async fn select_tenant_db(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let tenant_id = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.company_id.trim().to_string())
        .ok_or_else(|| ApiError::unauthorized("no verified token on request"))?;
    if tenant_id.is_empty() {
        return Err(ApiError::unauthorized("token carries no company_id"));
    }
    let pool = state.tenants.get_connection(&tenant_id).await?;
    req.extensions_mut().insert(TenantDb { tenant_id, pool });
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantDb
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantDb>()
            .cloned()
            .ok_or_else(|| ApiError::internal("tenant database was not selected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{TenantRouter, TenantSource};
    use crate::error::{codes, DbError};
    use crate::middleware::auth::parse_token;
    use crate::state::test_support::lazy_state;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use chrono::Duration;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use std::sync::Arc;
    use tower::{ServiceBuilder, ServiceExt};

    /// Lazy pools for every tenant except "gone".
    struct LazySource;

    #[async_trait]
    impl TenantSource<PgPool> for LazySource {
        async fn resolve(&self, tenant_id: &str) -> Result<PgPool, DbError> {
            if tenant_id == "gone" {
                return Err(DbError::UnknownTenant(tenant_id.to_string()));
            }
            let options = PgConnectOptions::new().host("127.0.0.1").database(tenant_id);
            Ok(PgPoolOptions::new().connect_lazy_with(options))
        }
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(|db: TenantDb| async move { db.tenant_id }))
            .layer(
                ServiceBuilder::new()
                    .layer(from_fn_with_state(state.clone(), parse_token))
                    .layer(from_fn_with_state(state, select_tenant_db)),
            )
    }

    fn request(state: &AppState, company: &str) -> axum::http::Request<Body> {
        let token = state.jwt.issue(&Claims::new("u-1", company, Duration::hours(1))).unwrap();
        axum::http::Request::builder()
            .uri("/whoami")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn routes_to_company_database() {
        let state = lazy_state().with_tenant_router(TenantRouter::<PgPool>::new(Arc::new(LazySource)));

        let resp = app(state.clone()).oneshot(request(&state, "acme")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"acme");
        assert_eq!(state.tenants.cached_tenants(), vec!["acme".to_string()]);
    }

    #[tokio::test]
    async fn unknown_company_is_internal_error() {
        let state = lazy_state().with_tenant_router(TenantRouter::<PgPool>::new(Arc::new(LazySource)));

        let resp = app(state.clone()).oneshot(request(&state, "gone")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.extensions().get::<ApiError>().is_some_and(|e| e.code == codes::INTERNAL));
        assert!(state.tenants.is_empty());
    }

    #[tokio::test]
    async fn empty_company_is_unauthorized() {
        let state = lazy_state().with_tenant_router(TenantRouter::<PgPool>::new(Arc::new(LazySource)));
        let resp = app(state.clone()).oneshot(request(&state, "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
