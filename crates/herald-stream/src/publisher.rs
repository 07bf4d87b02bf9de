//! Outbound alert publication.

use std::sync::Arc;

use herald_types::{AlertEvent, StreamId, SubscriberId};

use crate::{PublishError, StreamStore};

/// Appends one alert record per matched subscriber to the outbound stream.
///
/// Cheap to clone; every dispatch task holds its own handle to the shared
/// store.
#[derive(Clone)]
pub struct AlertPublisher {
    store: Arc<dyn StreamStore>,
    stream: String,
}

impl AlertPublisher {
    pub fn new(store: Arc<dyn StreamStore>, stream: impl Into<String>) -> Self {
        Self {
            store,
            stream: stream.into(),
        }
    }

    /// Name of the outbound stream.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Appends `{user_id, text}` to the outbound stream.
    ///
    /// There is no retry. A failed alert is lost and the caller decides how
    /// to report it.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` when the store rejects the append.
    pub fn publish(
        &self,
        subscriber_id: SubscriberId,
        text: &str,
    ) -> Result<StreamId, PublishError> {
        let alert = AlertEvent {
            subscriber_id,
            text: text.to_string(),
        };

        let id = self
            .store
            .append(&self.stream, &alert.to_fields())
            .map_err(|source| PublishError {
                subscriber_id,
                source,
            })?;

        tracing::info!(subscriber_id, stream = %self.stream, record_id = %id, "alert sent");
        Ok(id)
    }
}
