//! The top-level consumption loop.
//!
//! The consumer alternates between waiting on the inbound stream and
//! running one dispatch pass. Only one event is processed at a time.
//!
//! A record is deleted from the inbound stream as soon as it has been
//! decoded, before its dispatch pass finishes. Delivery is therefore
//! at-most-once: a crash during the pass loses the rest of that event's
//! fan-out.

use std::sync::Arc;
use std::time::Duration;

use herald_normalize::{decode_event, RecordError};
use herald_stream::{StreamError, StreamStore};
use tokio::task::JoinError;
use herald_types::{StreamId, StreamRecord};

use crate::dispatch::{DispatchReport, DispatchScheduler};
use crate::stats::PipelineStats;

/// Inbound stream name and loop timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// Inbound stream to read news records from.
    pub inbound: String,
    /// Sleep between reads while the stream is empty.
    pub poll_interval: Duration,
    /// Pause after a failed read before trying again.
    pub read_retry: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            inbound: "news".to_string(),
            poll_interval: Duration::from_millis(100),
            read_retry: Duration::from_secs(1),
        }
    }
}

/// Result of a single [`StreamConsumer::run_once`] step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The inbound stream was empty.
    Idle,
    /// The read failed; nothing was consumed.
    ReadFailed,
    /// A record was consumed but could not become an event.
    Dropped(RecordError),
    /// A record was consumed and dispatched.
    Dispatched(DispatchReport),
}

/// Reads inbound records one at a time and dispatches each.
pub struct StreamConsumer {
    store: Arc<dyn StreamStore>,
    scheduler: DispatchScheduler,
    settings: ConsumerSettings,
    stats: Arc<PipelineStats>,
}

impl StreamConsumer {
    pub fn new(
        store: Arc<dyn StreamStore>,
        scheduler: DispatchScheduler,
        settings: ConsumerSettings,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            store,
            scheduler,
            settings,
            stats,
        }
    }

    /// Runs forever. Read errors are logged and retried after
    /// `read_retry`; an empty stream is polled every `poll_interval`.
    pub async fn run(&self) {
        tracing::info!(stream = %self.settings.inbound, "consumer started, waiting for events");
        loop {
            match self.run_once().await {
                StepOutcome::Idle => tokio::time::sleep(self.settings.poll_interval).await,
                StepOutcome::ReadFailed => tokio::time::sleep(self.settings.read_retry).await,
                StepOutcome::Dropped(_) | StepOutcome::Dispatched(_) => {}
            }
        }
    }

    /// Consumes at most one record.
    pub async fn run_once(&self) -> StepOutcome {
        let record = match self.read().await {
            Ok(Ok(Some(record))) => record,
            Ok(Ok(None)) => return StepOutcome::Idle,
            Ok(Err(e)) => {
                tracing::error!(
                    stream = %self.settings.inbound,
                    error = %e,
                    "failed to read from inbound stream"
                );
                self.stats.record_read_error();
                return StepOutcome::ReadFailed;
            }
            Err(e) => {
                tracing::error!(stream = %self.settings.inbound, error = %e, "read task failed");
                self.stats.record_read_error();
                return StepOutcome::ReadFailed;
            }
        };

        self.stats.record_consumed();
        let record_id = record.id;
        let decoded = decode_event(&record.fields);

        self.remove(record_id).await;

        match decoded {
            Ok(event) => {
                tracing::info!(
                    record_id = %record_id,
                    tag_count = event.tags.len(),
                    tags = ?event.tags,
                    "processing event"
                );
                StepOutcome::Dispatched(self.scheduler.dispatch(&event).await)
            }
            Err(e) => {
                tracing::warn!(record_id = %record_id, error = %e, "dropping inbound record");
                self.stats.record_dropped();
                StepOutcome::Dropped(e)
            }
        }
    }

    async fn read(&self) -> Result<Result<Option<StreamRecord>, StreamError>, JoinError> {
        let store = self.store.clone();
        let stream = self.settings.inbound.clone();
        tokio::task::spawn_blocking(move || store.read_first(&stream)).await
    }

    /// Deletes a consumed record. Failures are logged, not retried.
    async fn remove(&self, id: StreamId) {
        let store = self.store.clone();
        let stream = self.settings.inbound.clone();
        let result = tokio::task::spawn_blocking(move || store.delete(&stream, id)).await;

        match result {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                tracing::warn!(record_id = %id, "inbound record was already gone");
            }
            Ok(Err(e)) => {
                tracing::error!(record_id = %id, error = %e, "failed to remove inbound record");
            }
            Err(e) => {
                tracing::error!(record_id = %id, error = %e, "remove task failed");
            }
        }
    }
}
