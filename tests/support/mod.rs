//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use freeset_gateway::config::GatewayConfig;
use freeset_gateway::error::GatewayError;
use freeset_gateway::retry::RetryPolicy;
use freeset_gateway::transport::{ProviderRequest, Transport};
use freeset_gateway::types::{ImageUpload, ProviderKind, RawResponse};

pub const TEST_KEY: &str = "test-key";

/// A minimal 1x1 PNG.
pub const PNG_1X1: [u8; 67] = [
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Backoff short enough for tests that talk to a real mock server.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_millis(1))
}

/// Every provider pointed at `base_url` with a test credential.
pub fn mock_config(base_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::new().with_retry(fast_retry());
    for kind in ProviderKind::ALL {
        let settings = config
            .provider(kind)
            .clone()
            .with_base_url(base_url)
            .with_api_key(TEST_KEY);
        config = config.with_provider(kind, settings);
    }
    config
}

/// Every provider pointed at `base_url` with no credentials.
pub fn keyless_config(base_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::new().with_retry(fast_retry());
    for kind in ProviderKind::ALL {
        let mut settings = config.provider(kind).clone().with_base_url(base_url);
        settings.api_key = None;
        config = config.with_provider(kind, settings);
    }
    config
}

pub fn png_upload() -> ImageUpload {
    ImageUpload::new("photo.png", "image/png", PNG_1X1.to_vec())
}

/// Transport that replays scripted outcomes and counts calls.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    calls: AtomicU32,
    outcomes: Mutex<VecDeque<Result<RawResponse, GatewayError>>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Result<RawResponse, GatewayError>>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        _provider_id: &str,
        _request: ProviderRequest,
    ) -> Result<RawResponse, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::InternalError("script exhausted".into())))
    }
}
