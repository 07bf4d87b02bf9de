//! SQLite-backed stream store.

use herald_db::DbPool;
use herald_types::{Fields, StreamId, StreamRecord};
use rusqlite::{params, OptionalExtension};

use crate::{StreamError, StreamStore};

/// Stream store over the `stream_entries` table.
///
/// Record ids come from the table's `AUTOINCREMENT` key, so they increase
/// strictly and are never reused after deletion.
#[derive(Clone)]
pub struct SqliteStreamStore {
    pool: DbPool,
}

impl SqliteStreamStore {
    /// Wraps a migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Number of records currently held in `stream`.
    pub fn len(&self, stream: &str) -> Result<usize, StreamError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM stream_entries WHERE stream = ?1",
            [stream],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Whether `stream` holds no records.
    pub fn is_empty(&self, stream: &str) -> Result<bool, StreamError> {
        Ok(self.len(stream)? == 0)
    }

    /// Returns every record of `stream`, oldest first.
    pub fn read_all(&self, stream: &str) -> Result<Vec<StreamRecord>, StreamError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, fields_json FROM stream_entries WHERE stream = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([stream], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, fields_json) = row?;
            records.push(to_record(id, &fields_json));
        }
        Ok(records)
    }
}

/// A payload that is not a JSON object decodes to no fields, so the record
/// is still consumed (and dropped) instead of wedging the reader.
fn to_record(id: i64, fields_json: &str) -> StreamRecord {
    let fields = match serde_json::from_str::<Fields>(fields_json) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(record_id = id, error = %e, "stream record payload is not an object");
            Fields::new()
        }
    };
    StreamRecord {
        id: StreamId(id),
        fields,
    }
}

impl StreamStore for SqliteStreamStore {
    fn read_first(&self, stream: &str) -> Result<Option<StreamRecord>, StreamError> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT id, fields_json FROM stream_entries WHERE stream = ?1 ORDER BY id LIMIT 1",
                [stream],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(id, fields_json)| to_record(id, &fields_json)))
    }

    fn delete(&self, stream: &str, id: StreamId) -> Result<bool, StreamError> {
        let conn = self.pool.get()?;
        let removed = conn.execute(
            "DELETE FROM stream_entries WHERE stream = ?1 AND id = ?2",
            params![stream, id.0],
        )?;
        Ok(removed > 0)
    }

    fn append(&self, stream: &str, fields: &Fields) -> Result<StreamId, StreamError> {
        let fields_json = serde_json::to_string(fields)?;
        let conn = self.pool.get()?;
        let id: i64 = conn.query_row(
            "INSERT INTO stream_entries (stream, fields_json) VALUES (?1, ?2) RETURNING id",
            params![stream, fields_json],
            |row| row.get(0),
        )?;
        Ok(StreamId(id))
    }
}
