//! Gateway service
//!
//! Composes the pieces per request: input validation, credential check, the
//! retrying provider call, response normalization, and the per-provider
//! fallback policy. Every path ends in a well-formed [`NormalizedResult`]
//! paired with the HTTP status the server should use.

use axum::http::StatusCode;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::config::{Degrade, GatewayConfig};
use crate::error::{ErrorCategory, GatewayError};
use crate::normalize::ResponseNormalizer;
use crate::providers::{
    ImageGenerationAdapter, OpenRouterAdapter, PixelcutAdapter, ProviderAdapter, RemoveBgAdapter,
    RequestContext, UnwatermarkAdapter,
};
use crate::retry::RetryExecutor;
use crate::transport::{HttpTransport, Transport};
use crate::types::{
    ImageGenerationRequest, ImageUpload, NormalizedResult, ProviderKind, TextRequest,
    placeholder_data,
};

/// Image MIME types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
];

/// A normalized envelope and the status code it should be served with.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub status: StatusCode,
    pub result: NormalizedResult,
}

impl GatewayReply {
    pub fn ok(result: NormalizedResult) -> Self {
        Self {
            status: StatusCode::OK,
            result,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            result: NormalizedResult::error(message),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(StatusCode::BAD_REQUEST, message)
    }
}

#[derive(Clone)]
pub struct Gateway {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn Transport>,
    executor: RetryExecutor,
    normalizer: ResponseNormalizer,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Build a gateway with the default `reqwest` transport.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let executor = RetryExecutor::new(config.retry.clone());
        let normalizer = ResponseNormalizer::new(config.extraction.clone());
        Self {
            config: Arc::new(config),
            transport,
            executor,
            normalizer,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn generate_text(&self, request: TextRequest) -> GatewayReply {
        if let Err(errors) = request.validate() {
            return GatewayReply::bad_request(validation_message(&errors));
        }
        self.run(&OpenRouterAdapter, &request).await
    }

    pub async fn generate_image(&self, request: ImageGenerationRequest) -> GatewayReply {
        if let Err(errors) = request.validate() {
            return GatewayReply::bad_request(validation_message(&errors));
        }
        self.run(&ImageGenerationAdapter, &request).await
    }

    pub async fn remove_background(&self, upload: ImageUpload) -> GatewayReply {
        self.run_upload(&RemoveBgAdapter, upload).await
    }

    pub async fn remove_watermark(&self, upload: ImageUpload) -> GatewayReply {
        self.run_upload(&UnwatermarkAdapter, upload).await
    }

    pub async fn upscale(&self, upload: ImageUpload) -> GatewayReply {
        self.run_upload(&PixelcutAdapter::Upscale, upload).await
    }

    pub async fn unblur(&self, upload: ImageUpload) -> GatewayReply {
        self.run_upload(&PixelcutAdapter::Unblur, upload).await
    }

    async fn run_upload<A>(&self, adapter: &A, upload: ImageUpload) -> GatewayReply
    where
        A: ProviderAdapter<Input = ImageUpload>,
    {
        if let Err(message) = validate_upload(&upload, self.config.max_upload_bytes) {
            return GatewayReply::bad_request(message);
        }
        tracing::info!(
            file = %upload.file_name,
            size = upload.data.len(),
            content_type = %upload.content_type,
            "file received"
        );
        self.run(adapter, &upload).await
    }

    async fn run<A: ProviderAdapter>(&self, adapter: &A, input: &A::Input) -> GatewayReply {
        let kind = adapter.kind();
        let settings = self.config.provider(kind);
        let span = tracing::info_span!(
            "provider_request",
            request_id = %Uuid::new_v4(),
            %kind,
            provider = %settings.provider_id,
        );

        async move {
            tracing::info!("request started");
            let Some(api_key) = settings.api_key.as_ref() else {
                let error = GatewayError::MissingApiKey(settings.provider_id.clone());
                tracing::error!(error = %error, "provider call skipped");
                return self.degrade(
                    kind,
                    settings.fallback.on_missing_credentials,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error.to_string(),
                );
            };
            let ctx = RequestContext { settings, api_key };
            let transport = self.transport.as_ref();
            let provider_id = settings.provider_id.as_str();

            let outcome = self
                .executor
                .execute(|| {
                    let request = adapter.build_request(ctx, input);
                    async move {
                        match request {
                            Ok(request) => transport.execute(provider_id, request).await,
                            Err(error) => Err(error),
                        }
                    }
                })
                .await;

            let raw = match outcome {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::error!(
                        error = %error,
                        upstream_status = ?error.status_code(),
                        "provider call failed"
                    );
                    return self.degrade(
                        kind,
                        settings.fallback.on_upstream_failure,
                        upstream_status(&error),
                        unavailable_message(kind, &error),
                    );
                }
            };

            match self.normalizer.extract(&raw, kind) {
                Ok(extracted) => {
                    tracing::info!("request succeeded");
                    GatewayReply::ok(NormalizedResult::api(
                        adapter.shape_data(&raw, extracted, settings),
                    ))
                }
                Err(not_found) => {
                    tracing::error!(error = %not_found, response = ?raw.as_json(), "result field missing");
                    self.degrade(
                        kind,
                        settings.fallback.on_missing_field,
                        StatusCode::BAD_GATEWAY,
                        format!("No result found in {} response", settings.provider_id),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    fn degrade(
        &self,
        kind: ProviderKind,
        policy: Degrade,
        status: StatusCode,
        message: String,
    ) -> GatewayReply {
        match policy {
            Degrade::Placeholder => {
                tracing::warn!(reason = %message, "serving placeholder result");
                let model = self.config.text.model.as_deref().unwrap_or_default();
                GatewayReply::ok(NormalizedResult::placeholder(placeholder_data(kind, model)))
            }
            Degrade::Error => GatewayReply::error(status, message),
        }
    }
}

/// Reject uploads that are empty, too large, or not a supported image type.
pub fn validate_upload(upload: &ImageUpload, max_bytes: usize) -> Result<(), String> {
    if upload.data.is_empty() {
        return Err("Empty file received".to_string());
    }
    if upload.data.len() > max_bytes {
        return Err(format!("File size exceeds {}MB limit", max_bytes / (1024 * 1024)));
    }
    let essence = upload.content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
        return Err("Unsupported file type. Allowed: JPG, PNG, WEBP, HEIC".to_string());
    }
    Ok(())
}

fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            (field.to_string(), message)
        })
        .collect();
    messages.sort();
    messages
        .into_iter()
        .map(|(_, message)| message)
        .collect::<Vec<_>>()
        .join("; ")
}

fn upstream_status(error: &GatewayError) -> StatusCode {
    match error.category() {
        ErrorCategory::Network if matches!(error, GatewayError::TimeoutError(_)) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ErrorCategory::Configuration | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn unavailable_message(kind: ProviderKind, error: &GatewayError) -> String {
    let label = match kind {
        ProviderKind::Text => "Text generation",
        ProviderKind::BackgroundRemoval => "Background removal",
        ProviderKind::WatermarkRemoval => "Watermark removal",
        ProviderKind::ImageGeneration => "Image generation",
        ProviderKind::Upscale => "Upscale",
        ProviderKind::Unblur => "Unblur",
    };
    match error {
        GatewayError::TimeoutError(_) => format!("{label} service timed out"),
        _ => format!("{label} service temporarily unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_validation_rules() {
        let ok = ImageUpload::new("a.png", "image/png", vec![1u8, 2, 3]);
        assert!(validate_upload(&ok, 10).is_ok());

        let empty = ImageUpload::new("a.png", "image/png", Vec::<u8>::new());
        assert_eq!(validate_upload(&empty, 10).unwrap_err(), "Empty file received");

        let big = ImageUpload::new("a.png", "image/png", vec![0u8; 11]);
        assert!(validate_upload(&big, 10).is_err());

        let gif = ImageUpload::new("a.gif", "image/gif", vec![1u8]);
        assert!(validate_upload(&gif, 10).unwrap_err().starts_with("Unsupported file type"));
    }

    #[test]
    fn statuses_follow_error_category() {
        assert_eq!(
            upstream_status(&GatewayError::TimeoutError("t".into())),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            upstream_status(&GatewayError::api_error(503, "down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            upstream_status(&GatewayError::AuthenticationError("bad".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            upstream_status(&GatewayError::ConfigurationError("bad header".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unavailable_message_never_leaks_provider_body() {
        let error = GatewayError::api_error(500, "secret upstream stack trace");
        let message = unavailable_message(ProviderKind::Text, &error);
        assert_eq!(message, "Text generation service temporarily unavailable");
    }
}
