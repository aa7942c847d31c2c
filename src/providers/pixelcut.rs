//! Pixelcut image enhancement: 2x upscale and unblur share one adapter.

use reqwest::multipart::Form;
use secrecy::ExposeSecret;

use super::{ProviderAdapter, RequestContext, image_part};
use crate::error::GatewayError;
use crate::transport::ProviderRequest;
use crate::types::{ImageUpload, ProviderKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelcutAdapter {
    Upscale,
    Unblur,
}

impl ProviderAdapter for PixelcutAdapter {
    type Input = ImageUpload;

    fn kind(&self) -> ProviderKind {
        match self {
            PixelcutAdapter::Upscale => ProviderKind::Upscale,
            PixelcutAdapter::Unblur => ProviderKind::Unblur,
        }
    }

    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &ImageUpload,
    ) -> Result<ProviderRequest, GatewayError> {
        let form = Form::new().part("image", image_part(input)?);
        let (path, form) = match self {
            PixelcutAdapter::Upscale => ("upscale", form.text("scale", "2")),
            PixelcutAdapter::Unblur => ("enhance", form),
        };

        ProviderRequest::multipart(ctx.settings.endpoint(path), form, ctx.settings.timeout).header(
            "authorization",
            &format!("Bearer {}", ctx.api_key.expose_secret()),
        )
    }
}
