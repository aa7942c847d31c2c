//! Per-provider extraction of the one value a caller cares about.
//!
//! Extraction is structural only. A missing field is reported as [`NotFound`];
//! deciding whether that becomes a placeholder or a client-visible error is the
//! gateway's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::data_uri::{decode_base64, encode_data_uri, image_mime};
use super::field_path::{FieldPath, resolve_first};
use crate::types::{ProviderKind, RawResponse};

/// Ordered candidate paths per provider kind.
///
/// The lists are data, not code: new provider shapes are supported by editing
/// (or configuring) a list, never the resolution algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Chat-completion text: message content first, then the flat `text` shape.
    pub text: Vec<FieldPath>,
    /// Base64 payloads when the background-removal provider answers in JSON.
    pub background_base64: Vec<FieldPath>,
    /// Watermark-removal result URL; top-level keys before nested ones.
    pub watermark_url: Vec<FieldPath>,
    /// Image-generation URL.
    pub image_url: Vec<FieldPath>,
    /// Image-generation inline base64 fallback.
    pub image_base64: Vec<FieldPath>,
    /// Upscale/unblur result URL.
    pub enhance_url: Vec<FieldPath>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            text: FieldPath::list(&["choices.0.message.content", "choices.0.text"]),
            background_base64: FieldPath::list(&["data.result_b64"]),
            watermark_url: FieldPath::list(&[
                "output_url",
                "result_url",
                "url",
                "image_url",
                "processed_url",
                "processed_image",
                "download_url",
                "data.url",
                "data.output_url",
                "data.result_url",
            ]),
            image_url: FieldPath::list(&["data.0.url", "output_url", "url"]),
            image_base64: FieldPath::list(&["data.0.b64_json"]),
            enhance_url: FieldPath::list(&["output_url", "result_url"]),
        }
    }
}

impl ExtractionRules {
    pub fn with_watermark_url(mut self, paths: Vec<FieldPath>) -> Self {
        self.watermark_url = paths;
        self
    }

    /// URL (or text) candidates for `kind`.
    pub fn primary_paths(&self, kind: ProviderKind) -> &[FieldPath] {
        match kind {
            ProviderKind::Text => &self.text,
            ProviderKind::BackgroundRemoval => &[],
            ProviderKind::WatermarkRemoval => &self.watermark_url,
            ProviderKind::ImageGeneration => &self.image_url,
            ProviderKind::Upscale | ProviderKind::Unblur => &self.enhance_url,
        }
    }

    /// Inline base64 candidates for `kind`, re-encoded as a data URI on match.
    pub fn base64_paths(&self, kind: ProviderKind) -> &[FieldPath] {
        match kind {
            ProviderKind::BackgroundRemoval => &self.background_base64,
            ProviderKind::ImageGeneration => &self.image_base64,
            _ => &[],
        }
    }
}

/// The payload held no value under any candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {kind} result found in provider response (tried: {})", .tried.join(", "))]
pub struct NotFound {
    pub kind: ProviderKind,
    pub tried: Vec<String>,
}

/// A value pulled out of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub value: String,
    /// Path that matched; `None` for binary payloads.
    pub path: Option<FieldPath>,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer {
    rules: ExtractionRules,
}

impl ResponseNormalizer {
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    /// Extract the single value for `kind` from `raw`.
    ///
    /// Pure and idempotent: the same input always yields the same outcome.
    pub fn extract(&self, raw: &RawResponse, kind: ProviderKind) -> Result<Extracted, NotFound> {
        match raw {
            RawResponse::Binary {
                bytes,
                content_type,
            } => {
                if bytes.is_empty() {
                    return Err(self.not_found(kind));
                }
                let mime = image_mime(bytes, content_type.as_deref());
                Ok(Extracted {
                    value: encode_data_uri(bytes, &mime),
                    path: None,
                })
            }
            RawResponse::Json(value) => self.extract_json(value, kind),
        }
    }

    fn extract_json(&self, value: &Value, kind: ProviderKind) -> Result<Extracted, NotFound> {
        if let Some((path, found)) = resolve_first(value, self.rules.primary_paths(kind)) {
            tracing::debug!(%kind, field = %path, "resolved result field");
            let found = if kind == ProviderKind::Text {
                found.trim()
            } else {
                found
            };
            return Ok(Extracted {
                value: found.to_string(),
                path: Some(path.clone()),
            });
        }

        if let Some((path, encoded)) = resolve_first(value, self.rules.base64_paths(kind)) {
            let Some(bytes) = decode_base64(encoded) else {
                tracing::warn!(%kind, field = %path, "inline payload is not valid base64");
                return Err(self.not_found(kind));
            };
            tracing::debug!(%kind, field = %path, "resolved inline base64 field");
            return Ok(Extracted {
                value: encode_data_uri(&bytes, &image_mime(&bytes, None)),
                path: Some(path.clone()),
            });
        }

        Err(self.not_found(kind))
    }

    fn not_found(&self, kind: ProviderKind) -> NotFound {
        let tried = self
            .rules
            .primary_paths(kind)
            .iter()
            .chain(self.rules.base64_paths(kind))
            .map(ToString::to_string)
            .collect();
        NotFound { kind, tried }
    }
}
