//! Self-contained `data:` URIs for binary image payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Pick the MIME type for an image payload: a declared `image/*` content type
/// wins, then magic-number sniffing, then PNG.
pub fn image_mime(bytes: &[u8], declared: Option<&str>) -> String {
    if let Some(declared) = declared {
        let essence = declared.split(';').next().unwrap_or("").trim();
        if essence.starts_with("image/") {
            return essence.to_string();
        }
    }
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or(DEFAULT_IMAGE_MIME)
        .to_string()
}

pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a bare base64 payload. Blank or malformed input yields `None`.
pub fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .ok()
        .filter(|bytes| !bytes.is_empty())
}

/// Inverse of [`encode_data_uri`]. Returns the MIME type and the decoded bytes.
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), bytes))
}
