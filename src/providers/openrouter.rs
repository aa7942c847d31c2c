//! OpenRouter chat completions (text generation).

use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};

use super::{ProviderAdapter, RequestContext};
use crate::config::{DEFAULT_TEXT_MODEL, ProviderSettings};
use crate::error::GatewayError;
use crate::normalize::Extracted;
use crate::transport::ProviderRequest;
use crate::types::{ProviderKind, RawResponse, TextRequest};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouterAdapter;

impl OpenRouterAdapter {
    fn model(settings: &ProviderSettings) -> &str {
        settings.model.as_deref().unwrap_or(DEFAULT_TEXT_MODEL)
    }

    fn build_payload(model: &str, input: &TextRequest) -> Value {
        json!({
            "model": model,
            "messages": [
                { "role": "user", "content": input.prompt.trim() }
            ],
            "max_tokens": input.max_tokens,
            "temperature": input.temperature,
        })
    }
}

impl ProviderAdapter for OpenRouterAdapter {
    type Input = TextRequest;

    fn kind(&self) -> ProviderKind {
        ProviderKind::Text
    }

    fn build_request(
        &self,
        ctx: RequestContext<'_>,
        input: &TextRequest,
    ) -> Result<ProviderRequest, GatewayError> {
        let payload = Self::build_payload(Self::model(ctx.settings), input);
        ProviderRequest::json(
            ctx.settings.endpoint("chat/completions"),
            payload,
            ctx.settings.timeout,
        )
        .header(
            "authorization",
            &format!("Bearer {}", ctx.api_key.expose_secret()),
        )
    }

    fn shape_data(
        &self,
        raw: &RawResponse,
        extracted: Extracted,
        settings: &ProviderSettings,
    ) -> Map<String, Value> {
        let body = raw.as_json();
        let model = body
            .and_then(|b| b.get("model"))
            .and_then(Value::as_str)
            .unwrap_or_else(|| Self::model(settings));

        let mut data = Map::new();
        data.insert("text".into(), Value::String(extracted.value));
        data.insert("model".into(), Value::from(model));
        if let Some(usage) = body.and_then(|b| b.get("usage")).filter(|u| !u.is_null()) {
            data.insert("usage".into(), usage.clone());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackPolicy;
    use secrecy::SecretString;
    use std::time::Duration;

    fn settings() -> ProviderSettings {
        ProviderSettings::new(
            "openrouter",
            "https://openrouter.ai/api/v1/",
            Duration::from_secs(120),
            FallbackPolicy::strict(),
        )
    }

    #[test]
    fn request_targets_chat_completions_with_bearer_key() {
        let settings = settings();
        let key = SecretString::from("sk-or-test");
        let ctx = RequestContext {
            settings: &settings,
            api_key: &key,
        };
        let mut input = TextRequest::new("  a poem  ");
        input.max_tokens = 100;

        let request = OpenRouterAdapter.build_request(ctx, &input).unwrap();
        assert_eq!(request.url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(request.headers["authorization"], "Bearer sk-or-test");
        assert_eq!(request.timeout, Duration::from_secs(120));
        match request.body {
            crate::transport::RequestBody::Json(body) => {
                assert_eq!(body["model"], DEFAULT_TEXT_MODEL);
                assert_eq!(body["messages"][0]["content"], "a poem");
                assert_eq!(body["max_tokens"], 100);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn shaped_data_carries_model_and_usage() {
        let raw = RawResponse::Json(json!({
            "model": "qwen/qwq-32b",
            "usage": { "total_tokens": 21 },
            "choices": [{ "message": { "content": "hi" } }]
        }));
        let extracted = Extracted {
            value: "hi".into(),
            path: None,
        };
        let data = OpenRouterAdapter.shape_data(&raw, extracted, &settings());
        assert_eq!(data["text"], "hi");
        assert_eq!(data["model"], "qwen/qwq-32b");
        assert_eq!(data["usage"]["total_tokens"], 21);
    }

    #[test]
    fn shaped_data_falls_back_to_configured_model() {
        let raw = RawResponse::Json(json!({ "choices": [] }));
        let extracted = Extracted {
            value: "hi".into(),
            path: None,
        };
        let data = OpenRouterAdapter.shape_data(&raw, extracted, &settings().with_model("custom/m"));
        assert_eq!(data["model"], "custom/m");
        assert!(!data.contains_key("usage"));
    }
}
