//! Offset/limit from the query string, clamped and attached to the request.

use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query, Request},
    http::{request::Parts, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Deserialize)]
struct PageQuery {
    offset: Option<String>,
    limit: Option<String>,
}

impl Pagination {
    /// Offset below zero becomes 0; limit of zero or less becomes 10, above 100 becomes 100.
    pub fn clamp(offset: i64, limit: i64) -> Self {
        let offset = offset.max(0);
        let limit = if limit <= 0 {
            DEFAULT_LIMIT
        } else {
            limit.min(MAX_LIMIT)
        };
        Pagination { offset, limit }
    }

    /// Missing or non-numeric values count as 0.
    pub fn from_uri(uri: &Uri) -> Self {
        let int = |v: Option<String>| v.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);
        match Query::<PageQuery>::try_from_uri(uri) {
            Ok(Query(q)) => Self::clamp(int(q.offset), int(q.limit)),
            Err(_) => Self::default(),
        }
    }
}

pub async fn pagination(mut req: Request, next: Next) -> Response {
    let page = Pagination::from_uri(req.uri());
    req.extensions_mut().insert(page);
    next.run(req).await
}

/// Uses the value set by [`pagination`], or reads the query string when the middleware is not installed.
#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Pagination>()
            .copied()
            .unwrap_or_else(|| Pagination::from_uri(&parts.uri)))
    }
}
