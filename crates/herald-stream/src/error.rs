//! Error types for stream operations.

use herald_types::SubscriberId;

/// Transport or storage failure while talking to the stream store.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No pooled connection could be checked out.
    #[error("stream store connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// A SQL statement failed.
    #[error("stream store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record fields could not be serialized.
    #[error("stream record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other transport failure.
    #[error("stream transport error: {0}")]
    Transport(String),
}

/// An alert could not be appended to the outbound stream.
#[derive(Debug, thiserror::Error)]
#[error("failed to publish alert for subscriber {subscriber_id}: {source}")]
pub struct PublishError {
    /// The subscriber whose alert was lost.
    pub subscriber_id: SubscriberId,
    /// The underlying stream failure.
    #[source]
    pub source: StreamError,
}
