//! Tag list resolution with a staged fallback chain.

use std::sync::OnceLock;

use regex::Regex;

/// Which stage of the fallback chain produced a tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// The payload decoded as a JSON string array.
    Structured,
    /// The trimmed, bracket-delimited payload decoded as a JSON string array.
    Bracketed,
    /// Quoted substrings were extracted.
    Quoted,
    /// The payload was split on commas.
    CommaSplit,
}

impl TagSource {
    /// Short label for log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Bracketed => "bracketed",
            Self::Quoted => "quoted",
            Self::CommaSplit => "comma_split",
        }
    }
}

fn quoted_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).expect("static pattern is valid"))
}

/// Decodes a JSON string array. `null` decodes to an empty list.
fn decode_array(s: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Option<Vec<String>>>(s)
        .ok()
        .map(Option::unwrap_or_default)
}

/// Resolves tags from a cleaned payload, reporting the stage that produced
/// them.
///
/// Stages, first success wins:
///
/// 1. Decode as a JSON string array.
/// 2. If the trimmed payload is `[...]`, decode the trimmed payload.
/// 3. Collect every `"..."` or `'...'` substring, trimmed, if any exist.
/// 4. Split on commas, trim, drop empty parts.
///
/// The last stage may yield an empty list.
pub fn resolve_tags(cleaned: &str) -> (Vec<String>, TagSource) {
    if let Some(tags) = decode_array(cleaned) {
        return (tags, TagSource::Structured);
    }

    let trimmed = cleaned.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Some(tags) = decode_array(trimmed) {
            return (tags, TagSource::Bracketed);
        }
    }

    let quoted: Vec<String> = quoted_pattern()
        .captures_iter(cleaned)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect();
    if !quoted.is_empty() {
        return (quoted, TagSource::Quoted);
    }

    let split = cleaned
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();
    (split, TagSource::CommaSplit)
}

/// Resolves tags from a cleaned payload. See [`resolve_tags`].
pub fn parse_tags(cleaned: &str) -> Vec<String> {
    resolve_tags(cleaned).0
}
