//! Gateway Configuration
//!
//! All settings are carried in an explicit [`GatewayConfig`] handed to the
//! gateway at construction. Nothing reads the environment at request time.

use secrecy::SecretString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::GatewayError;
use crate::normalize::ExtractionRules;
use crate::normalize::field_path::parse_path_list;
use crate::retry::RetryPolicy;
use crate::types::ProviderKind;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "AiFreeSet-Backend/2.0";
pub const DEFAULT_TEXT_MODEL: &str = "qwen/qwq-32b:free";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// What the gateway returns when a provider cannot deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degrade {
    /// Answer 200 with canned data marked `source: "dummy"`.
    Placeholder,
    /// Answer with an error envelope and a non-2xx status.
    Error,
}

/// Per-provider degradation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub on_missing_credentials: Degrade,
    pub on_upstream_failure: Degrade,
    pub on_missing_field: Degrade,
}

impl FallbackPolicy {
    pub const fn placeholder() -> Self {
        Self {
            on_missing_credentials: Degrade::Placeholder,
            on_upstream_failure: Degrade::Placeholder,
            on_missing_field: Degrade::Placeholder,
        }
    }

    pub const fn strict() -> Self {
        Self {
            on_missing_credentials: Degrade::Error,
            on_upstream_failure: Degrade::Error,
            on_missing_field: Degrade::Error,
        }
    }
}

/// Settings for one upstream provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider identifier used in logs and error messages
    pub provider_id: String,
    /// Credential; `None` short-circuits every call to the fallback policy
    pub api_key: Option<SecretString>,
    /// Base URL without trailing slash
    pub base_url: String,
    /// Model name, for providers that take one
    pub model: Option<String>,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub fallback: FallbackPolicy,
}

impl ProviderSettings {
    pub fn new(provider_id: &str, base_url: &str, timeout: Duration, fallback: FallbackPolicy) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            api_key: None,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: None,
            timeout,
            fallback,
        }
    }

    /// Set the API key; blank keys count as absent
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = if api_key.trim().is_empty() {
            None
        } else {
            Some(SecretString::from(api_key))
        };
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.provider_id.is_empty() {
            return Err(GatewayError::ConfigurationError(
                "Provider ID cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GatewayError::ConfigurationError(format!(
                "{}: base URL must start with http:// or https://",
                self.provider_id
            )));
        }
        if self.timeout.is_zero() {
            return Err(GatewayError::ConfigurationError(format!(
                "{}: timeout must be positive",
                self.provider_id
            )));
        }
        Ok(())
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub extraction: ExtractionRules,
    pub text: ProviderSettings,
    pub background_removal: ProviderSettings,
    pub watermark_removal: ProviderSettings,
    pub image_generation: ProviderSettings,
    pub enhance: ProviderSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            environment: "development".to_string(),
            allowed_origins: vec!["https://aifreeset.netlify.app".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            extraction: ExtractionRules::default(),
            text: ProviderSettings::new(
                "openrouter",
                "https://openrouter.ai/api/v1",
                Duration::from_secs(120),
                FallbackPolicy::strict(),
            )
            .with_model(DEFAULT_TEXT_MODEL),
            background_removal: ProviderSettings::new(
                "removebg",
                "https://api.remove.bg/v1.0",
                Duration::from_secs(120),
                FallbackPolicy::placeholder(),
            ),
            watermark_removal: ProviderSettings::new(
                "unwatermark",
                "https://api.unwatermark.ai/v1",
                Duration::from_secs(180),
                FallbackPolicy::placeholder(),
            ),
            image_generation: ProviderSettings::new(
                "openai-images",
                "https://api.openai.com/v1",
                Duration::from_secs(120),
                FallbackPolicy::placeholder(),
            )
            .with_model(DEFAULT_IMAGE_MODEL),
            enhance: ProviderSettings::new(
                "pixelcut",
                "https://api.pixelcut.ai/v1",
                Duration::from_secs(120),
                FallbackPolicy::placeholder(),
            ),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        let host: IpAddr = match get("GATEWAY_BIND_HOST") {
            Some(raw) => parse_var("GATEWAY_BIND_HOST", &raw)?,
            None => config.bind_addr.ip(),
        };
        let port: u16 = match get("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        config.bind_addr = SocketAddr::new(host, port);

        if let Some(env) = get("GATEWAY_ENV") {
            config.environment = env;
        }
        if let Some(origins) = get("CORS_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = get("GATEWAY_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_var("GATEWAY_MAX_UPLOAD_BYTES", &raw)?;
        }

        if let Some(raw) = get("GATEWAY_RETRY_MAX_ATTEMPTS") {
            config.retry = config
                .retry
                .with_max_attempts(parse_var("GATEWAY_RETRY_MAX_ATTEMPTS", &raw)?);
        }
        if let Some(raw) = get("GATEWAY_RETRY_BASE_DELAY_MS") {
            let millis: u64 = parse_var("GATEWAY_RETRY_BASE_DELAY_MS", &raw)?;
            config.retry = config.retry.with_initial_delay(Duration::from_millis(millis));
        }
        if let Some(raw) = get("GATEWAY_RETRY_MULTIPLIER") {
            config.retry = config
                .retry
                .with_backoff_multiplier(parse_var("GATEWAY_RETRY_MULTIPLIER", &raw)?);
        }

        if let Some(raw) = get("UNWATERMARK_RESULT_FIELDS") {
            let paths = parse_path_list(&raw)?;
            if paths.is_empty() {
                return Err(GatewayError::ConfigurationError(
                    "UNWATERMARK_RESULT_FIELDS must list at least one field path".to_string(),
                ));
            }
            config.extraction = config.extraction.with_watermark_url(paths);
        }

        apply_provider_env(&mut config.text, &get, "OPENROUTER");
        apply_provider_env(&mut config.background_removal, &get, "REMOVEBG");
        apply_provider_env(&mut config.watermark_removal, &get, "UNWATERMARK");
        apply_provider_env(&mut config.image_generation, &get, "IMAGE");
        apply_provider_env(&mut config.enhance, &get, "PIXELCUT");

        config.validate()?;
        Ok(config)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionRules) -> Self {
        self.extraction = extraction;
        self
    }

    /// Replace the settings for `kind` (upscale and unblur share one entry).
    pub fn with_provider(mut self, kind: ProviderKind, settings: ProviderSettings) -> Self {
        match kind {
            ProviderKind::Text => self.text = settings,
            ProviderKind::BackgroundRemoval => self.background_removal = settings,
            ProviderKind::WatermarkRemoval => self.watermark_removal = settings,
            ProviderKind::ImageGeneration => self.image_generation = settings,
            ProviderKind::Upscale | ProviderKind::Unblur => self.enhance = settings,
        }
        self
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Text => &self.text,
            ProviderKind::BackgroundRemoval => &self.background_removal,
            ProviderKind::WatermarkRemoval => &self.watermark_removal,
            ProviderKind::ImageGeneration => &self.image_generation,
            ProviderKind::Upscale | ProviderKind::Unblur => &self.enhance,
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.retry.max_attempts == 0 {
            return Err(GatewayError::ConfigurationError(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(GatewayError::ConfigurationError(
                "retry backoff multiplier must be >= 1".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(GatewayError::ConfigurationError(
                "max upload size must be positive".to_string(),
            ));
        }
        for settings in [
            &self.text,
            &self.background_removal,
            &self.watermark_removal,
            &self.image_generation,
            &self.enhance,
        ] {
            settings.validate()?;
        }
        Ok(())
    }
}

fn apply_provider_env<G>(settings: &mut ProviderSettings, get: &G, prefix: &str)
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(key) = get(&format!("{prefix}_API_KEY")) {
        *settings = settings.clone().with_api_key(key);
    }
    if let Some(url) = get(&format!("{prefix}_BASE_URL")) {
        *settings = settings.clone().with_base_url(&url);
    }
    if let Some(model) = get(&format!("{prefix}_MODEL")) {
        *settings = settings.clone().with_model(&model);
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, GatewayError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| GatewayError::ConfigurationError(format!("{key}={raw}: {e}")))
}
