//! Typed errors and HTTP mapping.

use crate::response::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application-level error codes carried in the envelope's `code` field.
pub mod codes {
    pub const OK: i32 = 0;
    pub const NOT_FOUND: i32 = 1;
    pub const UNAUTHORIZED: i32 = 1;
    pub const INVALID_REQUEST: i32 = 2;
    pub const INTERNAL: i32 = 2;
    pub const UPSTREAM: i32 = 3;
}

pub const MSG_NOT_FOUND: &str = "Not found";
pub const MSG_INVALID_REQUEST: &str = "Invalid request format";
pub const MSG_UNAUTHORIZED: &str = "Unauthorized request";
pub const MSG_INTERNAL: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("could not read .env: {0}")]
    DotEnv(#[source] dotenvy::Error),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("could not connect to database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("tenant lookup failed for '{tenant_id}': {source}")]
    Lookup {
        tenant_id: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("no database host registered for tenant '{0}'")]
    UnknownTenant(String),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

#[derive(Error, Debug)]
pub enum HttpClientError {
    #[error("request could not be sent: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request body could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid request option: {0}")]
    InvalidOption(String),
}

#[derive(Error, Debug)]
#[error("token rejected: {0}")]
pub struct JwtError(#[from] pub jsonwebtoken::errors::Error);

/// Error returned to API clients: HTTP status, application code and message.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl AsRef<str>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            format!("{} | {}", MSG_NOT_FOUND, message.as_ref()),
        )
    }

    /// Malformed or unparseable request.
    pub fn parse(message: impl AsRef<str>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_REQUEST,
            format!("{} | {}", MSG_INVALID_REQUEST, message.as_ref()),
        )
    }

    pub fn unauthorized(message: impl AsRef<str>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            format!("{} | {}", MSG_UNAUTHORIZED, message.as_ref()),
        )
    }

    pub fn internal(message: impl AsRef<str>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::INTERNAL,
            format!("{} | {}", MSG_INTERNAL, message.as_ref()),
        )
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        tracing::error!(error = %e, "database error");
        ApiError::internal(e.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(e: JwtError) -> Self {
        ApiError::unauthorized(e.to_string())
    }
}

impl From<HttpClientError> for ApiError {
    fn from(e: HttpClientError) -> Self {
        tracing::warn!(error = %e, "upstream call failed");
        ApiError::new(StatusCode::BAD_GATEWAY, codes::UPSTREAM, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::failure(self.status, self.code, self.message.clone());
        let mut response = body.into_response();
        // Lets `error_envelope` re-render the message with the service name.
        response.extensions_mut().insert(self);
        response
    }
}
