//! Microservice core: shared plumbing for multi-tenant HTTP services.
//!
//! Configuration from the environment, a primary Postgres pool plus a per-tenant pool cache, an
//! outbound HTTP client, JWT claims, request middlewares and the standard response envelope.

pub mod config;
pub mod database;
pub mod error;
pub mod http_client;
pub mod jwt;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod sql;
pub mod state;
pub mod telemetry;
pub mod validation;

pub use config::{load as load_config, AppConfig, Config, DbConfig, TenantDbConfig};
pub use database::{connect_primary, run_migrations, PgTenantSource, TenantRouter, TenantSource};
pub use error::{ApiError, ConfigError, DbError, HttpClientError, JwtError};
pub use http_client::{HttpClient, HttpResponse, RequestOptions};
pub use jwt::{Claims, JwtParser};
pub use middleware::{setup_middlewares, with_envelope, Pagination, ParsedBody, TenantDb};
pub use response::{ApiResponse, Meta};
pub use routes::common_routes;
pub use sql::{fetch_page, ListScope};
pub use state::AppState;
pub use telemetry::init_tracing;
pub use validation::{validate_excluding, violations, FieldViolation};
