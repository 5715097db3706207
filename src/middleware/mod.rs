//! Request middlewares and the extractors that read what they attach.
//!
//! Each middleware stores its result in the request extensions; handlers pull it back out with the
//! matching extractor (`Claims`, `TenantDb`, `Pagination`, `ParsedBody<T>`).

pub mod auth;
pub mod body;
pub mod envelope;
pub mod pagination;
pub mod tenant;
pub mod validate;

pub use auth::{bearer_token, parse_token};
pub use body::{body_parser, ParsedBody, BODY_LIMIT};
pub use envelope::error_envelope;
pub use pagination::{pagination, Pagination, DEFAULT_LIMIT, MAX_LIMIT};
pub use tenant::{select_tenant_db, TenantDb};
pub use validate::{validate_body, ExcludeFields};

use crate::state::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Wrap `router` in the tenant-scoped chain: token verification, tenant database selection, pagination.
pub fn setup_middlewares<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(state.clone(), parse_token))
            .layer(from_fn_with_state(state, select_tenant_db))
            .layer(from_fn(pagination)),
    )
}

/// Outermost layers for the whole service: body size limit and the error envelope.
pub fn with_envelope<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(state, error_envelope))
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{TenantRouter, TenantSource};
    use crate::error::DbError;
    use crate::jwt::Claims;
    use crate::state::test_support::lazy_state;
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, routing::get};
    use chrono::Duration;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use sqlx::PgPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct LazySource;

    #[async_trait]
    impl TenantSource<PgPool> for LazySource {
        async fn resolve(&self, tenant_id: &str) -> Result<PgPool, DbError> {
            let options = PgConnectOptions::new().host("127.0.0.1").database(tenant_id);
            Ok(PgPoolOptions::new().connect_lazy_with(options))
        }
    }

    async fn scoped(claims: Claims, db: TenantDb, page: Pagination) -> String {
        format!("{}:{}:{}:{}", claims.user_id, db.tenant_id, page.offset, page.limit)
    }

    fn app(state: AppState) -> Router {
        let scoped_routes = setup_middlewares(Router::new().route("/items", get(scoped)), state.clone());
        with_envelope(scoped_routes, state)
    }

    #[tokio::test]
    async fn full_chain_attaches_claims_tenant_and_page() {
        let state = lazy_state().with_tenant_router(TenantRouter::<PgPool>::new(Arc::new(LazySource)));
        let token = state.jwt.issue(&Claims::new("u-7", "acme", Duration::hours(1))).unwrap();
        let req = axum::http::Request::builder()
            .uri("/items?offset=20&limit=500")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();

        let resp = app(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"u-7:acme:20:100");
    }

    #[tokio::test]
    async fn missing_token_is_enveloped() {
        let state = lazy_state().with_tenant_router(TenantRouter::<PgPool>::new(Arc::new(LazySource)));
        let req = axum::http::Request::builder().uri("/items").body(Body::empty()).unwrap();

        let resp = app(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let message = body["message"].as_str().unwrap();
        assert!(message.starts_with("Mikroservis Template | Unauthorized request"));
        assert_eq!(body["code"], 1);
    }
}
