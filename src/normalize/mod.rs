//! Response normalization
//! - field_path.rs: `FieldPath` and ordered first-match resolution
//! - extract.rs: per-provider extraction rules and `ResponseNormalizer`
//! - data_uri.rs: base64 `data:` URIs for binary image payloads

pub mod data_uri;
pub mod extract;
pub mod field_path;

pub use data_uri::{decode_data_uri, encode_data_uri};
pub use extract::{Extracted, ExtractionRules, NotFound, ResponseNormalizer};
pub use field_path::{FieldPath, resolve_first};
