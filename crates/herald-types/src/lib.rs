//! Shared types for the Herald alert router.
//!
//! This crate holds the records that flow between the pipeline stages:
//! the normalized [`InboundEvent`], the read-only [`Subscriber`] snapshot
//! fetched per pagination batch, the outbound [`AlertEvent`], and the raw
//! [`StreamRecord`] exchanged with the stream store.
//!
//! Every other `herald-*` crate depends on this one for cross-cutting type
//! definitions, and this crate depends on nothing internal.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names used on the inbound and outbound streams.
pub mod fields {
    /// Free text of a news item (inbound) or alert (outbound).
    pub const TEXT: &str = "text";
    /// Serialized tag list of a news item (inbound only).
    pub const TAGS: &str = "tags";
    /// Target subscriber of an alert (outbound only).
    pub const USER_ID: &str = "user_id";
}

/// Subscriber identity. Also the pagination cursor key.
pub type SubscriberId = i64;

/// Key-value payload of a single stream record.
pub type Fields = Map<String, Value>;

/// Identifier of a record within a stream.
///
/// Ids are assigned by the stream store on append and are strictly
/// increasing within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId(pub i64);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw record read from a stream, before any normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Store-assigned record id, used to delete the record after hand-off.
    pub id: StreamId,
    /// Record payload.
    pub fields: Fields,
}

/// A news item that survived normalization and carries at least one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Cleaned free text, forwarded verbatim in every alert.
    pub text: String,
    /// Tags resolved from the raw tag payload. Order is preserved.
    pub tags: Vec<String>,
}

/// Read-only snapshot of one subscriber row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Unique, strictly ordered identity.
    pub id: SubscriberId,
    /// Human-readable name.
    pub display_name: String,
    /// Optional handle.
    pub username: Option<String>,
    pub is_premium: bool,
    pub is_admin: bool,
    /// Preferred summarization model.
    pub model_preference: String,
    /// Broad interest tags. Matched against a high overlap threshold.
    pub general_tags: Vec<String>,
    /// Narrow interest tags. Matched against a low overlap threshold.
    pub specific_tags: Vec<String>,
    /// Preferred language code.
    pub language: String,
}

/// A personalized alert produced for one matched subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    #[serde(rename = "user_id")]
    pub subscriber_id: SubscriberId,
    pub text: String,
}

impl AlertEvent {
    /// Builds the outbound stream payload: `user_id` (integer) and `text`.
    pub fn to_fields(&self) -> Fields {
        let mut map = Fields::new();
        map.insert(fields::USER_ID.to_string(), Value::from(self.subscriber_id));
        map.insert(fields::TEXT.to_string(), Value::from(self.text.clone()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_fields_use_wire_names() {
        let alert = AlertEvent {
            subscriber_id: 42,
            text: "Market up".to_string(),
        };
        let map = alert.to_fields();
        assert_eq!(map.len(), 2);
        assert_eq!(map[fields::USER_ID], Value::from(42));
        assert_eq!(map[fields::TEXT], Value::from("Market up"));
    }

    #[test]
    fn alert_serializes_subscriber_id_as_user_id() {
        let alert = AlertEvent {
            subscriber_id: 7,
            text: "hi".to_string(),
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["user_id"], 7);
        assert!(value.get("subscriber_id").is_none());
    }

    #[test]
    fn stream_ids_order_numerically() {
        assert!(StreamId(2) < StreamId(10));
        assert_eq!(StreamId(15).to_string(), "15");
    }
}
