//! OpenAI-style `images/generations` endpoint.

use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::{ProviderAdapter, RequestContext};
use crate::config::DEFAULT_IMAGE_MODEL;
use crate::error::GatewayError;
use crate::transport::ProviderRequest;
use crate::types::{ImageGenerationRequest, ProviderKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageGenerationAdapter;

impl ImageGenerationAdapter {
    /// Accept `1024*1024` as well as `1024x1024`.
    fn normalize_size(size: &str) -> String {
        size.trim().replace(['*', 'X'], "x")
    }

    fn build_payload(model: &str, input: &ImageGenerationRequest) -> Value {
        json!({
            "model": model,
            "prompt": input.prompt.trim(),
            "size": Self::normalize_size(&input.size),
            "n": 1,
        })
    }
}

impl ProviderAdapter for ImageGenerationAdapter {
    type Input = ImageGenerationRequest;

    fn kind(&self) -> ProviderKind {
        ProviderKind::ImageGeneration
    }

    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &ImageGenerationRequest,
    ) -> Result<ProviderRequest, GatewayError> {
        let model = ctx.settings.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL);
        ProviderRequest::json(
            ctx.settings.endpoint("images/generations"),
            Self::build_payload(model, input),
            ctx.settings.timeout,
        )
        .header(
            "authorization",
            &format!("Bearer {}", ctx.api_key.expose_secret()),
        )
    }
}
