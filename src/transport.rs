//! HTTP transport for provider round-trips.
//!
//! A [`ProviderRequest`] describes exactly one outbound call and is rebuilt for
//! every attempt (multipart forms are single-use). The transport performs the
//! call, enforces the per-attempt timeout and turns non-success statuses into
//! typed errors; it never retries on its own.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::multipart::Form;
use std::time::Duration;

use crate::error::{GatewayError, classify_http_error};
use crate::types::RawResponse;

/// Expected shape of a successful response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Binary,
}

pub enum RequestBody {
    Json(serde_json::Value),
    Multipart(Form),
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            RequestBody::Multipart(_) => f.write_str("Multipart(..)"),
        }
    }
}

/// One outbound provider call.
#[derive(Debug)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Duration,
    pub expect: ResponseFormat,
}

impl ProviderRequest {
    pub fn json(url: String, body: serde_json::Value, timeout: Duration) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Json(body),
            timeout,
            expect: ResponseFormat::Json,
        }
    }

    pub fn multipart(url: String, form: Form, timeout: Duration) -> Self {
        Self {
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Multipart(form),
            timeout,
            expect: ResponseFormat::Json,
        }
    }

    pub fn expect(mut self, expect: ResponseFormat) -> Self {
        self.expect = expect;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, GatewayError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::ConfigurationError(format!("Invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| GatewayError::ConfigurationError(format!("Invalid {name} header: {e}")))?;
        self.headers.insert(header_name, value);
        Ok(self)
    }
}

/// Performs a single provider round-trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        provider_id: &str,
        request: ProviderRequest,
    ) -> Result<RawResponse, GatewayError>;
}

/// `reqwest`-backed transport. The client is shared across requests; it holds
/// no per-request state.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: HeaderValue,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::ConfigurationError(format!("HTTP client: {e}")))?;
        Self::with_client(client, user_agent)
    }

    pub fn with_client(client: Client, user_agent: &str) -> Result<Self, GatewayError> {
        let user_agent = HeaderValue::from_str(user_agent)
            .map_err(|e| GatewayError::ConfigurationError(format!("Invalid user agent: {e}")))?;
        Ok(Self { client, user_agent })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        provider_id: &str,
        request: ProviderRequest,
    ) -> Result<RawResponse, GatewayError> {
        let ProviderRequest {
            url,
            mut headers,
            body,
            timeout,
            expect,
        } = request;
        headers
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());

        tracing::debug!(provider = provider_id, %url, "API request: POST");
        let builder = self.client.post(&url).headers(headers).timeout(timeout);
        let builder = match body {
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(GatewayError::from)?;
        let status = response.status();
        tracing::info!(provider = provider_id, status = status.as_u16(), %url, "API response");

        if !status.is_success() {
            let response_headers = response.headers().clone();
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_http_error(
                provider_id,
                status.as_u16(),
                &body_text,
                &response_headers,
            ));
        }

        match expect {
            ResponseFormat::Json => {
                let bytes = response.bytes().await.map_err(GatewayError::from)?;
                let value: serde_json::Value = serde_json::from_slice(&bytes)?;
                Ok(RawResponse::Json(value))
            }
            ResponseFormat::Binary => {
                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response.bytes().await.map_err(GatewayError::from)?;
                Ok(RawResponse::Binary {
                    bytes,
                    content_type,
                })
            }
        }
    }
}
