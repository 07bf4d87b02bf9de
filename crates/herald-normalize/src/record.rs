//! Decoding of raw inbound stream records into events.

use herald_types::{fields, Fields, InboundEvent};
use thiserror::Error;

use crate::{clean, resolve_tags};

/// Reasons an inbound record is dropped before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A required field is missing or is not a string.
    #[error("field '{0}' is missing or not a string")]
    InvalidField(&'static str),

    /// Every tag resolution stage produced an empty list.
    #[error("no tags could be resolved from '{0}'")]
    NoTags(String),
}

fn string_field<'a>(record: &'a Fields, name: &'static str) -> Result<&'a str, RecordError> {
    record
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or(RecordError::InvalidField(name))
}

/// Builds an [`InboundEvent`] from the `text` and `tags` fields of a record.
///
/// Both fields are cleaned. Tags are resolved with
/// [`resolve_tags`](crate::resolve_tags).
///
/// # Errors
///
/// Returns `RecordError::InvalidField` when either field is absent or not a
/// string, and `RecordError::NoTags` when no tag survives resolution.
pub fn decode_event(record: &Fields) -> Result<InboundEvent, RecordError> {
    let text = string_field(record, fields::TEXT)?;
    let raw_tags = string_field(record, fields::TAGS)?;

    let cleaned_tags = clean(raw_tags);
    let (tags, source) = resolve_tags(&cleaned_tags);

    if source != crate::TagSource::Structured {
        tracing::warn!(
            source = source.as_str(),
            original = raw_tags,
            cleaned = %cleaned_tags,
            "tags were not a well-formed array, used fallback"
        );
    }

    if tags.is_empty() {
        return Err(RecordError::NoTags(cleaned_tags));
    }

    Ok(InboundEvent {
        text: clean(text),
        tags,
    })
}
