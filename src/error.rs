//! Error Handling Module
//!
//! `GatewayError` is the single failure type that crosses the resilience layer.
//! Its [`GatewayError::is_retryable`] method is the only place that decides
//! whether a failed provider attempt may be attempted again.
//!
//! # Example
//!
//! ```rust,ignore
//! use freeset_gateway::error::GatewayError;
//!
//! let error = GatewayError::api_error(404, "Not found");
//! assert!(!error.is_retryable());
//! ```

use reqwest::header::HeaderMap;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Coarse error category, used for status mapping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The provider could not be reached or did not answer in time.
    Network,
    /// The provider answered with a 5xx status.
    Server,
    /// The provider rejected the request (4xx).
    Client,
    /// Our own input validation rejected the request.
    Validation,
    /// The gateway is misconfigured (missing or malformed settings).
    Configuration,
    /// Payload could not be decoded.
    Parsing,
    /// Anything else.
    Internal,
}

/// Errors produced while talking to a provider or preparing a request.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection refused/reset, DNS failure, TLS failure.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The attempt exceeded its per-provider timeout.
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// Non-success status returned by the provider.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// 401/403 from the provider.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// 429 from the provider.
    #[error("Rate limit error: {0}")]
    RateLimitError(String),

    /// Request rejected by local validation or by the provider as malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// The provider credential is not configured.
    #[error("{0} API key not configured")]
    MissingApiKey(String),

    /// Gateway configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn api_error_with_details(
        code: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Only transport failures, timeouts and 5xx responses qualify. Every
    /// 4xx-derived variant is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::TimeoutError(_) => true,
            Self::ApiError { code, .. } => *code >= 500,
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::TimeoutError(_) => ErrorCategory::Network,
            Self::ApiError { code, .. } if *code >= 500 => ErrorCategory::Server,
            Self::ApiError { .. }
            | Self::AuthenticationError(_)
            | Self::RateLimitError(_) => ErrorCategory::Client,
            Self::InvalidInput(_) => ErrorCategory::Validation,
            Self::MissingApiKey(_) | Self::ConfigurationError(_) => ErrorCategory::Configuration,
            Self::JsonError(_) => ErrorCategory::Parsing,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Upstream HTTP status when the error originated from a provider response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            Self::AuthenticationError(_) => Some(401),
            Self::RateLimitError(_) => Some(429),
            _ => None,
        }
    }
}

/// Only connection-level failures become the retryable [`GatewayError::HttpError`].
impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else if let Some(status) = err.status() {
            Self::api_error(status.as_u16(), err.to_string())
        } else if err.is_builder() {
            Self::ConfigurationError(err.to_string())
        } else if err.is_decode() {
            Self::JsonError(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::HttpError(err.to_string())
        } else {
            Self::InternalError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

/// Classify a non-success provider response into a typed error.
///
/// Request/trace identifiers found in the headers are appended to the message,
/// and at most 200 characters of the body are kept.
pub fn classify_http_error(
    provider_id: &str,
    status: u16,
    body_text: &str,
    headers: &HeaderMap,
) -> GatewayError {
    let id_keys = ["x-request-id", "x-trace-id", "cf-ray", "x-correlation-id"];
    let request_ids: Vec<String> = id_keys
        .iter()
        .filter_map(|k| {
            headers
                .get(*k)
                .and_then(|v| v.to_str().ok())
                .map(|v| format!("{k}={v}"))
        })
        .collect();
    let ids_suffix = if request_ids.is_empty() {
        String::new()
    } else {
        format!(" ids=[{}]", request_ids.join(","))
    };
    let body_sample = body_text.chars().take(200).collect::<String>();

    match status {
        401 | 403 => GatewayError::AuthenticationError(format!(
            "provider={provider_id} http={status}{ids_suffix} body_sample={body_sample}"
        )),
        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            GatewayError::RateLimitError(format!(
                "provider={provider_id} http=429 retry_after={retry_after}{ids_suffix}"
            ))
        }
        400 | 413 | 415 | 422 => GatewayError::InvalidInput(format!(
            "provider={provider_id} http={status}{ids_suffix} body_sample={body_sample}"
        )),
        _ => {
            let message = if body_sample.trim().is_empty() {
                format!("{provider_id} returned HTTP {status}")
            } else {
                body_sample
            };
            let details = match serde_json::from_str::<serde_json::Value>(body_text) {
                Ok(json) => serde_json::json!({
                    "status": status,
                    "provider": provider_id,
                    "response": json,
                    "request_ids": request_ids,
                }),
                Err(_) => serde_json::json!({
                    "status": status,
                    "provider": provider_id,
                    "request_ids": request_ids,
                }),
            };
            GatewayError::api_error_with_details(status, message, details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_transport_failures_are_retryable() {
        assert!(GatewayError::api_error(500, "boom").is_retryable());
        assert!(GatewayError::api_error(503, "unavailable").is_retryable());
        assert!(GatewayError::HttpError("connection reset".into()).is_retryable());
        assert!(GatewayError::TimeoutError("120s".into()).is_retryable());
    }

    #[test]
    fn client_errors_are_final() {
        assert!(!GatewayError::api_error(404, "missing").is_retryable());
        assert!(!GatewayError::AuthenticationError("bad key".into()).is_retryable());
        assert!(!GatewayError::RateLimitError("slow down".into()).is_retryable());
        assert!(!GatewayError::InvalidInput("empty".into()).is_retryable());
        assert!(!GatewayError::MissingApiKey("openrouter".into()).is_retryable());
    }

    #[test]
    fn status_code_reflects_provider_answer() {
        assert_eq!(GatewayError::api_error(503, "down").status_code(), Some(503));
        assert_eq!(GatewayError::RateLimitError("slow".into()).status_code(), Some(429));
        assert_eq!(GatewayError::TimeoutError("120s".into()).status_code(), None);
        assert_eq!(
            GatewayError::MissingApiKey("removebg".into()).to_string(),
            "removebg API key not configured"
        );
    }

    #[test]
    fn classify_maps_statuses_to_variants() {
        let headers = HeaderMap::new();
        assert!(matches!(
            classify_http_error("removebg", 401, "", &headers),
            GatewayError::AuthenticationError(_)
        ));
        assert!(matches!(
            classify_http_error("removebg", 429, "", &headers),
            GatewayError::RateLimitError(_)
        ));
        assert!(matches!(
            classify_http_error("removebg", 413, "too big", &headers),
            GatewayError::InvalidInput(_)
        ));
        match classify_http_error("removebg", 502, "<html>bad gateway</html>", &headers) {
            GatewayError::ApiError { code, message, .. } => {
                assert_eq!(code, 502);
                assert_eq!(message, "<html>bad gateway</html>");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn classify_keeps_request_ids_and_json_details() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "req-42".parse().unwrap());
        let err = classify_http_error("unwatermark", 500, r#"{"error":"overloaded"}"#, &headers);
        match err {
            GatewayError::ApiError {
                details: Some(details),
                ..
            } => {
                assert_eq!(details["response"]["error"], "overloaded");
                assert_eq!(details["request_ids"][0], "x-request-id=req-42");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_url_is_a_final_configuration_error() {
        let err: GatewayError = reqwest::Client::new()
            .post("http://bad host/x")
            .send()
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, GatewayError::ConfigurationError(_)));
        assert!(!err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[tokio::test]
    async fn refused_connection_is_retryable() {
        // Bind then drop, so nothing is listening on the port.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err: GatewayError = reqwest::Client::new()
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, GatewayError::HttpError(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn serde_errors_convert_to_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::JsonError(_)));
        assert_eq!(err.category(), ErrorCategory::Parsing);
    }
}
