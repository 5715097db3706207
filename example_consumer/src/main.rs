//! Example consumer: a small tenant-aware service built on microservice-core.
//!
//! Run from repo root: `cargo run -p example-consumer`
//!
//! Requests under `/api` need `Authorization: Bearer <token>`; the token's `company_id` picks the tenant
//! database.

use axum::{
    extract::Query,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use microservice_core::{
    common_routes,
    connect_primary,
    fetch_page,
    init_tracing,
    load_config,
    middleware::{body_parser, validate_body, ExcludeFields},
    setup_middlewares,
    with_envelope,
    ApiError,
    ApiResponse,
    AppState,
    DbError,
    ListScope,
    Pagination,
    ParsedBody,
    TenantDb,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
struct NewProduct {
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(range(min = 0))]
    price: i64,
    #[validate(length(min = 1))]
    sku: Option<String>,
}

/// Numbers and booleans bind with their own Postgres type; everything else as text.
fn filter_value(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(raw),
    }
}

/// GET /api/products?offset=&limit=&<column>=<value>
async fn list_products(
    db: TenantDb,
    page: Pagination,
    Query(mut filters): Query<HashMap<String, String>>,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    filters.remove("offset");
    filters.remove("limit");
    let scope = ListScope::new("products")
        .filters(filters.into_iter().map(|(k, v)| (k, filter_value(v))))
        .order_by("id")
        .paginate(page);
    let (rows, meta) = fetch_page(&db.pool, &scope).await.map_err(list_error)?;
    Ok(ApiResponse::success_with_meta(rows, meta))
}

/// Filter keys come from the query string, so a bad column name is the client's mistake.
fn list_error(e: DbError) -> ApiError {
    match e {
        DbError::InvalidIdentifier(name) => ApiError::parse(format!("unknown filter '{}'", name)),
        other => ApiError::from(other),
    }
}

/// POST /api/products
async fn create_product(db: TenantDb, body: ParsedBody<NewProduct>) -> Result<ApiResponse<Value>, ApiError> {
    let row: (i64,) = sqlx::query_as("INSERT INTO products (name, price, sku) VALUES ($1, $2, $3) RETURNING id")
        .bind(&body.name)
        .bind(body.price)
        .bind(body.sku.as_deref())
        .fetch_one(&db.pool)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!(tenant_id = %db.tenant_id, id = row.0, "product created");
    Ok(ApiResponse::success(serde_json::json!({ "id": row.0 })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing("microservice_core=info,example_consumer=info");
    tracing::info!(dsn = %config.db.dsn(), environment = %config.app.environment, "starting");

    let pool = connect_primary(&config.db).await?;
    let port = config.app.port;
    let state = AppState::new(config, pool)?;

    let create = axum::routing::post(create_product).layer(
        ServiceBuilder::new()
            .layer(from_fn(body_parser::<NewProduct>))
            .layer(from_fn_with_state(ExcludeFields::none(), validate_body::<NewProduct>)),
    );
    let api = setup_middlewares(
        Router::new().route("/products", get(list_products).merge(create)),
        state.clone(),
    );
    let app = with_envelope(common_routes(state.clone()).nest("/api", api), state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
