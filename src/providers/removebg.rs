//! remove.bg background removal. The provider answers with raw image bytes,
//! which the normalizer re-encodes as a data URI.

use reqwest::multipart::Form;
use secrecy::ExposeSecret;

use super::{ProviderAdapter, RequestContext, image_part};
use crate::error::GatewayError;
use crate::transport::{ProviderRequest, ResponseFormat};
use crate::types::{ImageUpload, ProviderKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveBgAdapter;

impl ProviderAdapter for RemoveBgAdapter {
    type Input = ImageUpload;

    fn kind(&self) -> ProviderKind {
        ProviderKind::BackgroundRemoval
    }

    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &ImageUpload,
    ) -> Result<ProviderRequest, GatewayError> {
        let form = Form::new()
            .part("image_file", image_part(input)?)
            .text("size", "auto");

        ProviderRequest::multipart(ctx.settings.endpoint("removebg"), form, ctx.settings.timeout)
            .expect(ResponseFormat::Binary)
            .header("x-api-key", ctx.api_key.expose_secret())
    }
}
