//! Validate a body previously parsed by `body_parser`.

use crate::error::ApiError;
use crate::middleware::body::ParsedBody;
use crate::validation::validate_excluding;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use validator::Validate;

/// Field names to skip during validation; the state for [`validate_body`].
#[derive(Clone, Debug, Default)]
pub struct ExcludeFields(Arc<[String]>);

impl ExcludeFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExcludeFields(fields.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Install with `from_fn_with_state(ExcludeFields::new([...]), validate_body::<T>)`, after `body_parser::<T>`.
pub async fn validate_body<T>(State(exclude): State<ExcludeFields>, req: Request, next: Next) -> Result<Response, ApiError>
where
    T: Validate + Send + Sync + 'static,
{
    let body = req
        .extensions()
        .get::<ParsedBody<T>>()
        .cloned()
        .ok_or_else(|| ApiError::internal("request body was not parsed"))?;
    let names: Vec<&str> = exclude.0.iter().map(String::as_str).collect();
    validate_excluding(&*body, &names)?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::middleware::body::body_parser;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::{from_fn, from_fn_with_state},
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::{ServiceBuilder, ServiceExt};

    #[derive(Debug, Deserialize, Validate)]
    struct NewProduct {
        #[validate(length(min = 1))]
        name: String,
        #[validate(range(min = 0))]
        price: i64,
    }

    fn app(exclude: ExcludeFields) -> Router {
        Router::new()
            .route("/products", post(|| async { "created" }))
            .layer(
                ServiceBuilder::new()
                    .layer(from_fn(body_parser::<NewProduct>))
                    .layer(from_fn_with_state(exclude, validate_body::<NewProduct>)),
            )
    }

    fn request(body: &'static str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/products")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let resp = app(ExcludeFields::none())
            .oneshot(request(r#"{"name":"Hammer","price":12}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_body_lists_every_field() {
        let resp = app(ExcludeFields::none())
            .oneshot(request(r#"{"name":"","price":-3}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = resp.extensions().get::<ApiError>().cloned().unwrap();
        assert_eq!(err.code, codes::INVALID_REQUEST);
        assert!(err.message.contains("[name]"));
        assert!(err.message.contains("[price]: '-3' | Needs to implement 'range'"));
        assert!(err.message.contains(" and "));
    }

    #[tokio::test]
    async fn excluded_fields_are_skipped() {
        let resp = app(ExcludeFields::new(["Price"]))
            .oneshot(request(r#"{"name":"Hammer","price":-3}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
