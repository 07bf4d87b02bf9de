//! Defensive normalization of inbound news payloads.
//!
//! Upstream producers are text generators, and their output regularly
//! carries control bytes, replacement characters and decorative glyphs.
//! Tag lists arrive as strings that are usually, but not always, a JSON
//! array. This crate turns a raw stream record into an
//! [`InboundEvent`](herald_types::InboundEvent):
//!
//! - [`clean`] strips unwanted characters and trims the result.
//! - [`parse_tags`] resolves a tag list through a fallback chain.
//! - [`decode_event`] applies both to the `text` and `tags` fields.

mod clean;
mod record;
mod tags;

pub use clean::{clean, ARTIFACTS};
pub use record::{decode_event, RecordError};
pub use tags::{parse_tags, resolve_tags, TagSource};
