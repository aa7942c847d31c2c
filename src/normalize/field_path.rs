//! Field path resolution over arbitrarily nested JSON.
//!
//! A [`FieldPath`] is either a top-level key (`url`) or a dot-separated chain
//! (`data.output_url`). Numeric segments index into arrays (`data.0.url`).
//! Resolution is a pure function of the value and the ordered path list:
//! the first path that yields a non-empty value wins.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path. Empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, GatewayError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::ConfigurationError(
                "field path cannot be empty".to_string(),
            ));
        }
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(GatewayError::ConfigurationError(format!(
                "field path `{trimmed}` contains an empty segment"
            )));
        }
        Ok(Self { segments })
    }

    /// Build a list from trusted literals, skipping validation.
    pub fn list(paths: &[&str]) -> Vec<FieldPath> {
        paths
            .iter()
            .map(|p| FieldPath {
                segments: p.split('.').map(str::to_string).collect(),
            })
            .collect()
    }

    /// Walk the segments one lookup at a time. Stops at the first absent key.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl FromStr for FieldPath {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Return the first path (in list order) that resolves to a non-blank string.
///
/// `null`, empty strings and non-string values count as absent, so the search
/// moves on to the next candidate.
pub fn resolve_first<'p, 'v>(
    root: &'v Value,
    paths: &'p [FieldPath],
) -> Option<(&'p FieldPath, &'v str)> {
    paths.iter().find_map(|path| {
        path.resolve(root)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| (path, s))
    })
}

/// Parse a comma separated list of paths, e.g. from an environment variable.
pub fn parse_path_list(raw: &str) -> Result<Vec<FieldPath>, GatewayError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FieldPath::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_top_level_and_nested_keys() {
        let value = json!({ "url": "A", "data": { "output_url": "B" } });
        assert_eq!(FieldPath::parse("url").unwrap().resolve(&value), Some(&json!("A")));
        assert_eq!(
            FieldPath::parse("data.output_url").unwrap().resolve(&value),
            Some(&json!("B"))
        );
    }

    #[test]
    fn missing_intermediate_key_short_circuits() {
        let value = json!({ "data": "not an object" });
        assert_eq!(FieldPath::parse("data.url").unwrap().resolve(&value), None);
        assert_eq!(FieldPath::parse("result.data.url").unwrap().resolve(&value), None);
    }

    #[test]
    fn numeric_segments_index_arrays() {
        let value = json!({ "choices": [{ "message": { "content": "hi" } }] });
        let path = FieldPath::parse("choices.0.message.content").unwrap();
        assert_eq!(path.resolve(&value), Some(&json!("hi")));
        assert_eq!(FieldPath::parse("choices.1.message").unwrap().resolve(&value), None);
    }

    #[test]
    fn first_present_value_wins() {
        let paths = FieldPath::list(&["output_url", "url", "data.url"]);
        let value = json!({ "output_url": "", "url": "A", "data": { "url": "B" } });
        let (path, found) = resolve_first(&value, &paths).unwrap();
        assert_eq!(path.to_string(), "url");
        assert_eq!(found, "A");
    }

    #[test]
    fn resolution_skips_non_string_matches() {
        let paths = FieldPath::list(&["data", "data.0.url"]);
        let value = json!({ "data": [{ "url": "https://cdn/x.png" }] });
        let (path, url) = resolve_first(&value, &paths).unwrap();
        assert_eq!(path.to_string(), "data.0.url");
        assert_eq!(url, "https://cdn/x.png");

        let nulls = json!({ "output_url": null, "url": false });
        assert!(resolve_first(&nulls, &FieldPath::list(&["output_url", "url"])).is_none());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("data..url").is_err());
        assert!(parse_path_list("url, ,data.url").unwrap().len() == 2);
    }

    #[test]
    fn serde_uses_dotted_string_form() {
        let path: FieldPath = serde_json::from_value(json!("data.result_url")).unwrap();
        assert_eq!(path.resolve(&json!({ "data": { "result_url": "R" } })), Some(&json!("R")));
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("data.result_url"));
    }
}
