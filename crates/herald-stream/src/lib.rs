//! Stream store access for the Herald alert router.
//!
//! The router reads news records from an inbound stream and appends alert
//! records to an outbound stream. Both go through the [`StreamStore`]
//! contract so the consumer loop and the publisher can be handed any
//! implementation, including test doubles.
//!
//! [`SqliteStreamStore`] is the bundled implementation. It keeps every
//! stream in one `stream_entries` table of the shared SQLite database.
//!
//! All operations are blocking. Async callers run them through
//! `tokio::task::spawn_blocking`.

mod error;
mod publisher;
mod sqlite;

pub use error::{PublishError, StreamError};
pub use publisher::AlertPublisher;
pub use sqlite::SqliteStreamStore;

use herald_types::{Fields, StreamId, StreamRecord};

/// Read, delete and append access to named streams.
///
/// Implementations must tolerate concurrent use from many dispatch tasks.
pub trait StreamStore: Send + Sync {
    /// Returns the oldest record still present in `stream`, if any.
    fn read_first(&self, stream: &str) -> Result<Option<StreamRecord>, StreamError>;

    /// Removes one record. Returns whether a record was removed.
    fn delete(&self, stream: &str, id: StreamId) -> Result<bool, StreamError>;

    /// Appends a record and returns its id.
    fn append(&self, stream: &str, fields: &Fields) -> Result<StreamId, StreamError>;
}
