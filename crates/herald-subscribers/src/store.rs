//! SQLite-backed subscriber pagination.

use herald_db::DbPool;
use herald_types::{Subscriber, SubscriberId};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};

use crate::{StoreError, SubscriberSource};

/// Reads subscriber batches from the `subscribers` table.
#[derive(Clone)]
pub struct SqliteSubscriberStore {
    pool: DbPool,
}

impl SqliteSubscriberStore {
    /// Wraps a migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SubscriberSource for SqliteSubscriberStore {
    fn next_batch(
        &self,
        last_id: SubscriberId,
        limit: usize,
    ) -> Result<Vec<Subscriber>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, display_name, username, is_premium, is_admin, model_preference,
                    general_tags_json, specific_tags_json, language
             FROM subscribers
             WHERE id > ?1
             ORDER BY id
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![last_id, limit as i64], row_to_subscriber)?;

        let mut batch = Vec::with_capacity(limit);
        for row in rows {
            batch.push(row?);
        }
        Ok(batch)
    }
}

fn row_to_subscriber(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    let id: SubscriberId = row.get(0)?;
    let general_tags = decode_tags(id, "general_tags_json", row.get_ref(6)?);
    let specific_tags = decode_tags(id, "specific_tags_json", row.get_ref(7)?);

    Ok(Subscriber {
        id,
        display_name: row.get(1)?,
        username: row.get(2)?,
        is_premium: row.get(3)?,
        is_admin: row.get(4)?,
        model_preference: row.get(5)?,
        general_tags,
        specific_tags,
        language: row.get(8)?,
    })
}

/// Decodes one serialized tag column. Anything that is not a JSON string
/// array, including NULL, becomes an empty set.
fn decode_tags(id: SubscriberId, column: &'static str, value: ValueRef<'_>) -> Vec<String> {
    let bytes = match value {
        ValueRef::Text(b) | ValueRef::Blob(b) => b,
        ValueRef::Null => &[][..],
        ValueRef::Integer(_) | ValueRef::Real(_) => {
            tracing::warn!(subscriber_id = id, column, "tag column is not text, treating as empty");
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<String>>(bytes) {
        Ok(tags) => tags,
        Err(e) => {
            tracing::warn!(
                subscriber_id = id,
                column,
                error = %e,
                "failed to decode tag column, treating as empty"
            );
            Vec::new()
        }
    }
}

/// Inserts or replaces one subscriber row, serializing both tag sets.
///
/// Used to seed the table; the router itself never writes subscribers.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure.
pub fn insert_subscriber(conn: &Connection, subscriber: &Subscriber) -> Result<(), StoreError> {
    let general = serde_json::to_string(&subscriber.general_tags)
        .map_err(|e| StoreError::Other(e.to_string()))?;
    let specific = serde_json::to_string(&subscriber.specific_tags)
        .map_err(|e| StoreError::Other(e.to_string()))?;

    conn.execute(
        "INSERT OR REPLACE INTO subscribers
            (id, display_name, username, is_premium, is_admin, model_preference,
             general_tags_json, specific_tags_json, language)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            subscriber.id,
            subscriber.display_name,
            subscriber.username,
            subscriber.is_premium,
            subscriber.is_admin,
            subscriber.model_preference,
            general,
            specific,
            subscriber.language,
        ],
    )?;
    Ok(())
}
