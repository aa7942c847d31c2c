//! HTTP surface
//!
//! Thin axum layer over [`Gateway`]: every handler answers with a
//! [`GatewayReply`] rendered as a JSON envelope.

pub mod upload;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::gateway::{Gateway, GatewayReply};
use crate::types::{ImageGenerationRequest, ImageUpload, ProviderKind, TextRequest};
use upload::read_image_upload;

/// Room for multipart boundaries and the non-file fields on top of the image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub const ENDPOINTS: [&str; 8] = [
    "GET /",
    "POST /api/text",
    "POST /api/image",
    "POST /api/ai-art",
    "POST /api/background-remove",
    "POST /api/watermark-remove",
    "POST /api/upscale",
    "POST /api/unblur",
];

pub type AppState = Arc<Gateway>;

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.result)).into_response()
    }
}

/// Build the application router.
pub fn router(gateway: AppState) -> Router {
    let config = gateway.config();
    let body_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let cors = cors_layer(&config.allowed_origins);

    Router::new()
        .route("/", get(health))
        .route("/api/text", post(generate_text))
        .route("/api/image", post(generate_image))
        .route("/api/ai-art", post(generate_image))
        .route("/api/background-remove", post(remove_background))
        .route("/api/watermark-remove", post(remove_watermark))
        .route("/api/upscale", post(upscale))
        .route("/api/unblur", post(unblur))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(gateway)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(|response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                    let status = response.status().as_u16();
                    if status >= 500 {
                        tracing::error!(status, latency_ms = %latency.as_millis(), "request failed with server error");
                    } else {
                        tracing::info!(status, latency_ms = %latency.as_millis(), "request completed");
                    }
                }),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect::<Vec<_>>(),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    environment: String,
    port: u16,
    api_keys_loaded: BTreeMap<String, bool>,
    endpoints: &'static [&'static str],
}

async fn health(State(gateway): State<AppState>) -> Json<HealthResponse> {
    let config = gateway.config();
    let api_keys_loaded = ProviderKind::ALL
        .iter()
        .map(|kind| {
            let settings = config.provider(*kind);
            (settings.provider_id.clone(), settings.has_credentials())
        })
        .collect();

    Json(HealthResponse {
        status: "OK",
        message: "AiFreeSet gateway is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: config.environment.clone(),
        port: config.bind_addr.port(),
        api_keys_loaded,
        endpoints: &ENDPOINTS,
    })
}

async fn generate_text(
    State(gateway): State<AppState>,
    payload: Result<Json<TextRequest>, JsonRejection>,
) -> GatewayReply {
    match payload {
        Ok(Json(request)) => gateway.generate_text(request).await,
        Err(rejection) => GatewayReply::bad_request(rejection.body_text()),
    }
}

async fn generate_image(
    State(gateway): State<AppState>,
    payload: Result<Json<ImageGenerationRequest>, JsonRejection>,
) -> GatewayReply {
    match payload {
        Ok(Json(request)) => gateway.generate_image(request).await,
        Err(rejection) => GatewayReply::bad_request(rejection.body_text()),
    }
}

async fn remove_background(
    State(gateway): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayReply {
    match upload_from(&gateway, multipart).await {
        Ok(upload) => gateway.remove_background(upload).await,
        Err(reply) => reply,
    }
}

async fn remove_watermark(
    State(gateway): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayReply {
    match upload_from(&gateway, multipart).await {
        Ok(upload) => gateway.remove_watermark(upload).await,
        Err(reply) => reply,
    }
}

async fn upscale(
    State(gateway): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayReply {
    match upload_from(&gateway, multipart).await {
        Ok(upload) => gateway.upscale(upload).await,
        Err(reply) => reply,
    }
}

async fn unblur(
    State(gateway): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayReply {
    match upload_from(&gateway, multipart).await {
        Ok(upload) => gateway.unblur(upload).await,
        Err(reply) => reply,
    }
}

async fn upload_from(
    gateway: &Gateway,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageUpload, GatewayReply> {
    let multipart = multipart.map_err(|rejection| GatewayReply::bad_request(rejection.body_text()))?;
    read_image_upload(multipart, gateway.config().max_upload_bytes).await
}

async fn not_found(uri: Uri) -> GatewayReply {
    GatewayReply::error(StatusCode::NOT_FOUND, format!("Route {} not found", uri.path()))
}

async fn method_not_allowed(method: Method, uri: Uri) -> GatewayReply {
    GatewayReply::error(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} not allowed on {}", uri.path()),
    )
}
