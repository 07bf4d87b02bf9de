//! Shared fixtures for router integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use herald_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use herald_server::dispatch::DispatchScheduler;
use herald_server::stats::PipelineStats;
use herald_server::worker::WorkerPool;
use herald_stream::{AlertPublisher, SqliteStreamStore, StreamError, StreamStore};
use herald_subscribers::{insert_subscriber, StoreError, SubscriberSource};
use herald_types::{fields, Fields, StreamId, StreamRecord, Subscriber, SubscriberId};
use serde_json::Value;
use tempfile::TempDir;

pub const INBOUND: &str = "news";
pub const OUTBOUND: &str = "alerts";

/// A migrated on-disk database shared by subscriber and stream stores.
pub struct TestDb {
    _dir: TempDir,
    pub pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("herald.db");
        let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        {
            let conn = pool.get().expect("connection should succeed");
            run_migrations(&conn).expect("migrations should succeed");
        }
        Self { _dir: dir, pool }
    }

    pub fn seed(&self, subscribers: &[Subscriber]) {
        let conn = self.pool.get().expect("connection");
        for subscriber in subscribers {
            insert_subscriber(&conn, subscriber).expect("insert subscriber");
        }
    }

    pub fn streams(&self) -> SqliteStreamStore {
        SqliteStreamStore::new(self.pool.clone())
    }

    /// `user_id`s of every alert on the outbound stream, sorted.
    pub fn alerted_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .streams()
            .read_all(OUTBOUND)
            .expect("read alerts")
            .into_iter()
            .map(|r| r.fields[fields::USER_ID].as_i64().expect("integer user_id"))
            .collect();
        ids.sort_unstable();
        ids
    }
}

pub fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn subscriber(id: SubscriberId, general: &[&str], specific: &[&str]) -> Subscriber {
    Subscriber {
        id,
        display_name: format!("user-{id}"),
        username: None,
        is_premium: false,
        is_admin: false,
        model_preference: "gpt".to_string(),
        general_tags: tags(general),
        specific_tags: tags(specific),
        language: "en".to_string(),
    }
}

pub fn news_fields(text: &str, raw_tags: &str) -> Fields {
    let mut map = Fields::new();
    map.insert(fields::TEXT.to_string(), Value::from(text));
    map.insert(fields::TAGS.to_string(), Value::from(raw_tags));
    map
}

pub fn scheduler(
    subscribers: Arc<dyn SubscriberSource>,
    streams: Arc<dyn StreamStore>,
    workers: usize,
    batch_size: usize,
    stats: Arc<PipelineStats>,
) -> DispatchScheduler {
    DispatchScheduler::new(
        subscribers,
        AlertPublisher::new(streams, OUTBOUND),
        WorkerPool::new(workers),
        batch_size,
        stats,
    )
}

/// Serves fixed batches in order, failing once `fail_after_batches` batches were served.
pub struct ScriptedSource {
    subscribers: Vec<Subscriber>,
    fail_after_batches: Option<usize>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(mut subscribers: Vec<Subscriber>) -> Self {
        subscribers.sort_by_key(|s| s.id);
        Self {
            subscribers,
            fail_after_batches: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_after(mut self, batches: usize) -> Self {
        self.fail_after_batches = Some(batches);
        self
    }
}

impl SubscriberSource for ScriptedSource {
    fn next_batch(
        &self,
        last_id: SubscriberId,
        limit: usize,
    ) -> Result<Vec<Subscriber>, StoreError> {
        let served = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after_batches.is_some_and(|n| served >= n) {
            return Err(StoreError::Other("connection lost".to_string()));
        }
        Ok(self
            .subscribers
            .iter()
            .filter(|s| s.id > last_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Wraps a real stream store, tracking concurrent appends and optionally
/// failing appends for chosen subscribers.
pub struct InstrumentedStreams {
    inner: SqliteStreamStore,
    append_delay: Duration,
    fail_for: Vec<i64>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub read_failures: Mutex<usize>,
}

impl InstrumentedStreams {
    pub fn new(inner: SqliteStreamStore) -> Self {
        Self {
            inner,
            append_delay: Duration::ZERO,
            fail_for: Vec::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            read_failures: Mutex::new(0),
        }
    }

    pub fn with_append_delay(mut self, delay: Duration) -> Self {
        self.append_delay = delay;
        self
    }

    pub fn failing_for(mut self, ids: &[i64]) -> Self {
        self.fail_for = ids.to_vec();
        self
    }

    /// The next `n` reads fail with a transport error.
    pub fn fail_next_reads(&self, n: usize) {
        *self.read_failures.lock().unwrap() = n;
    }
}

impl StreamStore for InstrumentedStreams {
    fn read_first(&self, stream: &str) -> Result<Option<StreamRecord>, StreamError> {
        let mut remaining = self.read_failures.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(StreamError::Transport("connection reset".to_string()));
        }
        drop(remaining);
        self.inner.read_first(stream)
    }

    fn delete(&self, stream: &str, id: StreamId) -> Result<bool, StreamError> {
        self.inner.delete(stream, id)
    }

    fn append(&self, stream: &str, record: &Fields) -> Result<StreamId, StreamError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.append_delay);

        let user_id = record.get(fields::USER_ID).and_then(Value::as_i64);
        let result = if user_id.is_some_and(|id| self.fail_for.contains(&id)) {
            Err(StreamError::Transport("outbound unavailable".to_string()))
        } else {
            self.inner.append(stream, record)
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
