//! Cursor-paginated access to the subscriber population.
//!
//! Subscribers are read in fixed-size batches ordered by id. The caller
//! feeds the largest id of one batch into the next request, so a full
//! traversal visits every subscriber once and ends with an empty batch.
//! Nothing is cached between batches.

mod error;
mod store;

pub use error::StoreError;
pub use store::{insert_subscriber, SqliteSubscriberStore};

use herald_types::{Subscriber, SubscriberId};

/// A source of subscriber batches.
///
/// Implementations must tolerate concurrent use.
pub trait SubscriberSource: Send + Sync {
    /// Returns up to `limit` subscribers with `id > last_id`, ascending by
    /// id. An empty batch means the traversal is exhausted.
    fn next_batch(
        &self,
        last_id: SubscriberId,
        limit: usize,
    ) -> Result<Vec<Subscriber>, StoreError>;
}
