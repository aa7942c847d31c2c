//! Multipart image upload parsing.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use crate::gateway::GatewayReply;
use crate::types::ImageUpload;

/// Multipart field that carries the image.
pub const IMAGE_FIELD: &str = "image";

const FALLBACK_FILE_NAME: &str = "upload";

/// Read the `image` field from a multipart body. Other fields are skipped.
pub async fn read_image_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<ImageUpload, GatewayReply> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(GatewayReply::bad_request("No image file provided")),
            Err(e) => return Err(multipart_error(e, max_bytes)),
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;

        let content_type = resolve_content_type(declared.as_deref(), &file_name, &data);
        return Ok(ImageUpload::new(file_name, content_type, data));
    }
}

/// Declared image type first, then the file extension, then magic bytes.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str, data: &[u8]) -> String {
    if let Some(declared) = declared.filter(|ct| ct.starts_with("image/")) {
        return declared.to_string();
    }
    if let Some(guess) = mime_guess::from_path(file_name)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
    {
        return guess.essence_str().to_string();
    }
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    declared.unwrap_or("application/octet-stream").to_string()
}

fn multipart_error(error: MultipartError, max_bytes: usize) -> GatewayReply {
    tracing::warn!(error = %error, "multipart read error");
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayReply::bad_request(format!(
            "File size exceeds {}MB limit",
            max_bytes / (1024 * 1024)
        ))
    } else {
        GatewayReply::bad_request(format!("Failed to read upload: {}", error.body_text()))
    }
}
