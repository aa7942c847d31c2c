//! Provider adapters
//!
//! Each adapter knows how to describe one outbound call for its provider and
//! how to publish the extracted value. Retry, extraction and fallback policy
//! live in [`crate::gateway`] and are shared by every adapter.

pub mod image_generation;
pub mod openrouter;
pub mod pixelcut;
pub mod removebg;
pub mod unwatermark;

use reqwest::multipart::Part;
use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::config::ProviderSettings;
use crate::error::GatewayError;
use crate::normalize::Extracted;
use crate::transport::ProviderRequest;
use crate::types::{ImageUpload, ProviderKind, RawResponse};

pub use image_generation::ImageGenerationAdapter;
pub use openrouter::OpenRouterAdapter;
pub use pixelcut::PixelcutAdapter;
pub use removebg::RemoveBgAdapter;
pub use unwatermark::UnwatermarkAdapter;

/// Everything an adapter needs to build one attempt's request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub settings: &'a ProviderSettings,
    pub api_key: &'a SecretString,
}

pub trait ProviderAdapter: Send + Sync {
    /// Validated input carried across attempts.
    type Input: Send + Sync;

    fn kind(&self) -> ProviderKind;

    /// Describe one round-trip. Called once per attempt.
    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &Self::Input,
    ) -> Result<ProviderRequest, GatewayError>;

    /// Data published in a successful envelope.
    fn shape_data(
        &self,
        _raw: &RawResponse,
        extracted: Extracted,
        _settings: &ProviderSettings,
    ) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert(self.kind().result_field().to_string(), Value::String(extracted.value));
        data
    }
}

/// Multipart part carrying an uploaded image. `Bytes` is reference-counted, so
/// rebuilding the part per attempt does not copy the buffer.
pub(crate) fn image_part(upload: &ImageUpload) -> Result<Part, GatewayError> {
    let body = reqwest::Body::from(upload.data.clone());
    Part::stream_with_length(body, upload.data.len() as u64)
        .file_name(upload.file_name.clone())
        .mime_str(&upload.content_type)
        .map_err(|e| GatewayError::InvalidInput(format!("Invalid content type: {e}")))
}
