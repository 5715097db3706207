//! Common routes: health, readiness, version.

use crate::error::{codes, MSG_INTERNAL};
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

#[derive(Serialize)]
struct VersionBody {
    name: String,
    environment: String,
    version: &'static str,
}

async fn health() -> ApiResponse<HealthBody> {
    ApiResponse::success(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> ApiResponse<ReadyBody> {
    match sqlx::query("SELECT 1").fetch_optional(&state.pool).await {
        Ok(_) => ApiResponse::success(ReadyBody {
            status: "ok",
            database: "ok",
        }),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            let mut resp = ApiResponse::error(
                state.app_name(),
                StatusCode::SERVICE_UNAVAILABLE,
                codes::INTERNAL,
                format!("{} | database unavailable", MSG_INTERNAL),
            );
            resp.data = Some(ReadyBody {
                status: "degraded",
                database: "unavailable",
            });
            resp
        }
    }
}

async fn version(State(state): State<AppState>) -> ApiResponse<VersionBody> {
    ApiResponse::success(VersionBody {
        name: state.config.app.name.clone(),
        environment: state.config.app.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /health, GET /ready (primary pool check), GET /version.
pub fn common_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::lazy_state;
    use axum::body::Body;
    use tower::ServiceExt;

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_enveloped() {
        let (status, body) = get_json(common_routes(lazy_state()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["message"], "");
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn version_reports_service_name() {
        let (status, body) = get_json(common_routes(lazy_state()), "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Mikroservis Template");
        assert_eq!(body["data"]["environment"], "dev");
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }
}
