//! Parse the JSON request body once and share it with later middlewares and the handler.

use crate::error::{codes, ApiError, MSG_INVALID_REQUEST};
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde::de::DeserializeOwned;
use std::ops::Deref;
use std::sync::Arc;

pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Body parsed by [`body_parser`].
#[derive(Debug)]
pub struct ParsedBody<T>(pub Arc<T>);

impl<T> Clone for ParsedBody<T> {
    fn clone(&self) -> Self {
        ParsedBody(Arc::clone(&self.0))
    }
}

impl<T> Deref for ParsedBody<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Middleware: deserialize the body as `T` or reject with a 400 parse error (413 when the body is over
/// the limit). The raw bytes stay on the request, so a `Json` extractor downstream still works.
pub async fn body_parser<T>(req: Request, next: Next) -> Result<Response, ApiError>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, BODY_LIMIT).await.map_err(|e| {
        if exceeds_limit(&e) {
            ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                codes::INVALID_REQUEST,
                format!("{} | request body is too large", MSG_INVALID_REQUEST),
            )
        } else {
            ApiError::parse(e.to_string())
        }
    })?;
    let data: T = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "request body rejected");
        ApiError::parse(e.to_string())
    })?;
    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(ParsedBody(Arc::new(data)));
    Ok(next.run(req).await)
}

/// True when the body was cut off by a length limit, ours or an outer `RequestBodyLimitLayer`.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[async_trait]
impl<S, T> FromRequestParts<S> for ParsedBody<T>
where
    S: Send + Sync,
    T: Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ParsedBody<T>>()
            .cloned()
            .ok_or_else(|| ApiError::internal("request body was not parsed"))
    }
}
