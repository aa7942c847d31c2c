//! Core data types shared by the gateway, the normalizer and the server.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// Which upstream service a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Chat-completion style LLM (OpenRouter)
    Text,
    /// Background removal returning raw image bytes (remove.bg)
    BackgroundRemoval,
    /// Watermark removal returning a URL in a drifting schema (unwatermark.ai)
    WatermarkRemoval,
    /// Prompt to image (OpenAI-style images API)
    ImageGeneration,
    /// 2x upscale (Pixelcut)
    Upscale,
    /// Sharpen/deblur (Pixelcut)
    Unblur,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Text,
        ProviderKind::BackgroundRemoval,
        ProviderKind::WatermarkRemoval,
        ProviderKind::ImageGeneration,
        ProviderKind::Upscale,
        ProviderKind::Unblur,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Text => "text",
            ProviderKind::BackgroundRemoval => "background-remove",
            ProviderKind::WatermarkRemoval => "watermark-remove",
            ProviderKind::ImageGeneration => "image",
            ProviderKind::Upscale => "upscale",
            ProviderKind::Unblur => "unblur",
        }
    }

    /// Name of the data field the extracted value is published under.
    pub const fn result_field(&self) -> &'static str {
        match self {
            ProviderKind::Text => "text",
            ProviderKind::ImageGeneration => "image_url",
            _ => "result_url",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful payload of a single provider attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    Json(Value),
    Binary {
        bytes: Bytes,
        content_type: Option<String>,
    },
}

impl RawResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RawResponse::Json(value) => Some(value),
            RawResponse::Binary { .. } => None,
        }
    }
}

/// Where the data in a [`NormalizedResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Api,
    Dummy,
}

/// The uniform envelope returned to clients.
///
/// Constructed only through [`NormalizedResult::api`],
/// [`NormalizedResult::placeholder`] and [`NormalizedResult::error`], so an
/// envelope always carries exactly one of provider data, placeholder data, or
/// an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<ResultSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NormalizedResult {
    pub fn api(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            source: Some(ResultSource::Api),
            data: Some(data),
            error: None,
        }
    }

    pub fn placeholder(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            source: Some(ResultSource::Dummy),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            source: None,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn source(&self) -> Option<ResultSource> {
        self.source
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(name))
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Canned data substituted when a provider is unavailable.
pub fn placeholder_data(kind: ProviderKind, text_model: &str) -> Map<String, Value> {
    let mut data = Map::new();
    match kind {
        ProviderKind::Text => {
            data.insert(
                "text".into(),
                Value::from(
                    "This is a dummy response. The AI text generation service is temporarily unavailable.",
                ),
            );
            data.insert("model".into(), Value::from(text_model));
        }
        ProviderKind::BackgroundRemoval => {
            data.insert(
                "result_url".into(),
                Value::from("https://via.placeholder.com/512x512.png?text=Background+Removed+Placeholder"),
            );
        }
        ProviderKind::WatermarkRemoval => {
            data.insert(
                "result_url".into(),
                Value::from("https://via.placeholder.com/512x512.png?text=Watermark+Removed+Placeholder"),
            );
        }
        ProviderKind::ImageGeneration => {
            data.insert(
                "image_url".into(),
                Value::from("https://via.placeholder.com/1024x1024.png?text=AI+Art+Placeholder"),
            );
        }
        ProviderKind::Upscale => {
            data.insert(
                "result_url".into(),
                Value::from("https://via.placeholder.com/1024x1024.png?text=Upscaled+Placeholder"),
            );
        }
        ProviderKind::Unblur => {
            data.insert(
                "result_url".into(),
                Value::from("https://via.placeholder.com/512x512.png?text=Unblurred+Placeholder"),
            );
        }
    }
    data
}

fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().is_empty() {
        let mut error = ValidationError::new("blank_prompt");
        error.message = Some("Prompt is required and must be a non-empty string".into());
        return Err(error);
    }
    Ok(())
}

/// Body of `POST /api/text`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TextRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_prompt"))]
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 32000))]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

const fn default_max_tokens() -> u32 {
    2000
}

const fn default_temperature() -> f32 {
    0.7
}

/// Body of `POST /api/image`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImageGenerationRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_prompt"))]
    pub prompt: String,
    #[serde(default = "default_image_size")]
    pub size: String,
}

impl ImageGenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: default_image_size(),
        }
    }
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

/// A validated image upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_envelope_has_no_data_or_source() {
        let value = serde_json::to_value(NormalizedResult::error("nope")).unwrap();
        assert_eq!(value, json!({ "success": false, "error": "nope" }));
    }

    #[test]
    fn placeholder_envelope_is_marked_dummy() {
        let result = NormalizedResult::placeholder(placeholder_data(ProviderKind::WatermarkRemoval, "m"));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["source"], "dummy");
        assert!(value["data"]["result_url"].as_str().unwrap().contains("Watermark"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn every_envelope_carries_exactly_one_payload() {
        let envelopes = [
            NormalizedResult::api(Map::new()),
            NormalizedResult::placeholder(Map::new()),
            NormalizedResult::error("nope"),
        ];
        for result in envelopes {
            assert!(result.data().is_some() != result.error_message().is_some());
            assert_eq!(result.is_success(), result.source().is_some());
        }
    }

    #[test]
    fn blank_prompt_fails_validation() {
        assert!(TextRequest::new("   \n").validate().is_err());
        assert!(TextRequest::new("write a poem").validate().is_ok());
    }

    #[test]
    fn text_request_defaults_apply() {
        let request: TextRequest = serde_json::from_value(json!({ "prompt": "hi" })).unwrap();
        assert_eq!(request.max_tokens, 2000);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_temperature_fails_validation() {
        let mut request = TextRequest::new("hi");
        request.temperature = 3.5;
        assert!(request.validate().is_err());
    }

    #[test]
    fn every_kind_has_placeholder_under_its_result_field() {
        for kind in ProviderKind::ALL {
            let data = placeholder_data(kind, "model");
            assert!(data.contains_key(kind.result_field()), "{kind}");
        }
    }
}
