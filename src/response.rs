//! Standard response envelope: `{message, data, code, meta}`.

use crate::error::codes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Paging information attached to list responses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub total_records: i64,
    pub current_offset: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub message: String,
    pub data: Option<T>,
    #[serde(skip)]
    pub status: StatusCode,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with code 0 and an empty message.
    pub fn success(data: T) -> Self {
        ApiResponse {
            message: String::new(),
            data: Some(data),
            status: StatusCode::OK,
            code: codes::OK,
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, meta: Meta) -> Self {
        ApiResponse {
            meta: Some(meta),
            ..Self::success(data)
        }
    }

    /// Error envelope whose message is prefixed with the service name: `"<app> | <message>"`.
    pub fn error(app_name: &str, status: StatusCode, code: i32, message: impl AsRef<str>) -> Self {
        Self::failure(status, code, format!("{} | {}", app_name, message.as_ref()))
    }

    /// Error envelope with the message used verbatim.
    pub fn failure(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        ApiResponse {
            message: message.into(),
            data: None,
            status,
            code,
            meta: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
