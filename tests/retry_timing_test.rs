//! Backoff timing through the full gateway, on tokio's paused clock.

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use freeset_gateway::error::GatewayError;
use freeset_gateway::gateway::Gateway;
use freeset_gateway::retry::RetryPolicy;
use freeset_gateway::types::{RawResponse, ResultSource, TextRequest};
use serde_json::json;
use support::{ScriptedTransport, keyless_config, mock_config, png_upload};
use tokio::time::Instant;

fn completion() -> RawResponse {
    RawResponse::Json(json!({
        "choices": [{ "message": { "content": "recovered" } }]
    }))
}

/// The paused clock jumps straight to each timer deadline; allow for
/// millisecond rounding of those deadlines.
fn assert_elapsed_about(started: Instant, expected: Duration) {
    let elapsed = started.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(5),
        "expected ~{expected:?}, slept {elapsed:?}"
    );
}

fn default_backoff_gateway(transport: Arc<ScriptedTransport>) -> Gateway {
    let config = mock_config("http://provider.invalid").with_retry(RetryPolicy::default());
    Gateway::with_transport(config, transport)
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_then_success_sleeps_three_seconds() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Err(GatewayError::api_error(500, "boom")),
        Err(GatewayError::HttpError("connection reset".into())),
        Ok(completion()),
    ]));
    let gateway = default_backoff_gateway(transport.clone());

    let started = Instant::now();
    let reply = gateway.generate_text(TextRequest::new("hello")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.result.field("text"), Some(&json!("recovered")));
    assert_eq!(transport.calls(), 3);
    // 1000ms after the first failure, 2000ms after the second.
    assert_elapsed_about(started, Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_final_client_error_does_not_sleep() {
    let transport = Arc::new(ScriptedTransport::new(vec![Err(
        GatewayError::AuthenticationError("invalid key".into()),
    )]));
    let gateway = default_backoff_gateway(transport.clone());

    let started = Instant::now();
    let reply = gateway.generate_text(TextRequest::new("hello")).await;

    assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
    assert_eq!(transport.calls(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_exhaust_all_attempts() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Err(GatewayError::TimeoutError("attempt 1".into())),
        Err(GatewayError::TimeoutError("attempt 2".into())),
        Err(GatewayError::TimeoutError("attempt 3".into())),
    ]));
    let gateway = default_backoff_gateway(transport.clone());

    let started = Instant::now();
    let reply = gateway.generate_text(TextRequest::new("hello")).await;

    assert_eq!(reply.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(transport.calls(), 3);
    assert_elapsed_about(started, Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn test_missing_credentials_never_reach_transport() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(completion())]));
    let gateway = Gateway::with_transport(keyless_config("http://provider.invalid"), transport.clone());

    let reply = gateway.remove_background(png_upload()).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.result.source(), Some(ResultSource::Dummy));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_schema_mismatch_is_extracted_once() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse::Json(
        json!({ "foo": "bar" }),
    ))]));
    let gateway = default_backoff_gateway(transport.clone());

    let reply = gateway.remove_watermark(png_upload()).await;

    assert_eq!(reply.result.source(), Some(ResultSource::Dummy));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_eight_attempts_sleep_the_full_uncapped_sum() {
    let mut outcomes: Vec<Result<RawResponse, GatewayError>> = (1..=7)
        .map(|n| Err(GatewayError::api_error(503, format!("unavailable #{n}"))))
        .collect();
    outcomes.push(Ok(completion()));
    let transport = Arc::new(ScriptedTransport::new(outcomes));
    let config = mock_config("http://provider.invalid")
        .with_retry(RetryPolicy::default().with_max_attempts(8));
    let gateway = Gateway::with_transport(config, transport.clone());

    let started = Instant::now();
    let reply = gateway.generate_text(TextRequest::new("hello")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(transport.calls(), 8);
    // 1s * 2^(k-1) for k = 1..=7
    assert_elapsed_about(started, Duration::from_millis(127_000));
}
