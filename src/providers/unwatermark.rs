//! unwatermark.ai watermark removal.
//!
//! The response schema is not fixed; the result URL is located through the
//! configured `watermark_url` field paths.

use reqwest::multipart::Form;
use secrecy::ExposeSecret;

use super::{ProviderAdapter, RequestContext, image_part};
use crate::error::GatewayError;
use crate::transport::ProviderRequest;
use crate::types::{ImageUpload, ProviderKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnwatermarkAdapter;

impl ProviderAdapter for UnwatermarkAdapter {
    type Input = ImageUpload;

    fn kind(&self) -> ProviderKind {
        ProviderKind::WatermarkRemoval
    }

    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &ImageUpload,
    ) -> Result<ProviderRequest, GatewayError> {
        let form = Form::new().part("image", image_part(input)?);

        ProviderRequest::multipart(ctx.settings.endpoint("remove"), form, ctx.settings.timeout)
            .header(
                "authorization",
                &format!("Bearer {}", ctx.api_key.expose_secret()),
            )
    }
}
