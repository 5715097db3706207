//! Outbound HTTP helper: JSON in, typed JSON out.
//!
//! Every request carries `Content-Type: application/json` and a `Service` header naming the caller, with
//! a 30 second timeout unless [`RequestOptions`] says otherwise. Caller headers replace defaults with the
//! same name. Statuses of 400 and above are errors carrying the raw response body; nothing is retried.

use crate::error::HttpClientError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const SERVICE_HEADER: &str = "service";

/// Per-request overrides.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub headers: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    /// `None` or zero uses [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Convenience for service-to-service calls that forward the caller's token.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse<T> {
    pub status: u16,
    pub body: T,
    pub headers: HeaderMap,
}

#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    defaults: HeaderMap,
}

impl HttpClient {
    /// Client whose `Service` header is `service_name`.
    pub fn new(service_name: &str) -> Result<Self, HttpClientError> {
        let mut defaults = HeaderMap::new();
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        defaults.insert(
            HeaderName::from_static(SERVICE_HEADER),
            HeaderValue::from_str(service_name)
                .map_err(|_| HttpClientError::InvalidOption(format!("service name '{}'", service_name)))?,
        );
        Ok(Self::with_client(reqwest::Client::new(), defaults))
    }

    pub fn with_client(inner: reqwest::Client, defaults: HeaderMap) -> Self {
        HttpClient { inner, defaults }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        self.send::<T, ()>(Method::GET, url, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        self.send(Method::POST, url, Some(body), options).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        self.send(Method::PUT, url, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        self.send::<T, ()>(Method::DELETE, url, None, options).await
    }

    /// Send one request and decode the body as `T`.
    pub async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<HttpResponse<T>, HttpClientError> {
        let headers = self.merge_headers(&options.headers)?;
        let timeout = options
            .timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut request = self
            .inner
            .request(method.clone(), url)
            .headers(headers)
            .timeout(timeout);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(HttpClientError::Encode)?;
            request = request.body(bytes);
        }

        tracing::debug!(%method, url, "outbound request");
        let response = request.send().await.map_err(HttpClientError::Transport)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(HttpClientError::Transport)?;

        if status >= 400 {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            tracing::debug!(%method, url, status, "outbound request failed");
            return Err(HttpClientError::Status { status, body });
        }

        let body = serde_json::from_slice(&bytes).map_err(HttpClientError::Decode)?;
        Ok(HttpResponse { status, body, headers })
    }

    fn merge_headers(&self, extra: &HashMap<String, String>) -> Result<HeaderMap, HttpClientError> {
        let mut headers = self.defaults.clone();
        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpClientError::InvalidOption(format!("header name '{}'", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| HttpClientError::InvalidOption(format!("value for header '{}'", name)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}
