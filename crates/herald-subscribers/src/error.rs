//! Error types for subscriber queries.

/// The subscriber query could not be executed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No pooled connection could be checked out.
    #[error("subscriber store connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// The query or a row read failed.
    #[error("subscriber query failed: {0}")]
    Database(#[from] rusqlite::Error),

    /// Any other store failure.
    #[error("subscriber store error: {0}")]
    Other(String),
}
