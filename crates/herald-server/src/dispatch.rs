//! One dispatch pass: traverse every subscriber for an event and publish
//! alerts for the ones that match.
//!
//! Batches are read strictly in ascending id order. Each subscriber becomes
//! one task on the [`WorkerPool`]; tasks of the same pass run concurrently
//! and may publish in any order. The pass returns only after every task it
//! submitted has finished, across all batches.

use std::sync::Arc;

use herald_stream::AlertPublisher;
use herald_subscribers::SubscriberSource;
use herald_types::{InboundEvent, Subscriber, SubscriberId};
use serde::Serialize;

use crate::stats::PipelineStats;
use crate::worker::{TaskError, TaskGroup, WorkerPool};

/// What happened to one subscriber's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Tags did not overlap enough.
    NotMatched,
    /// An alert was appended to the outbound stream.
    Sent,
    /// The subscriber matched but the alert could not be appended.
    Lost,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Subscribers read from the store and handed to the pool.
    pub visited: u64,
    /// Subscribers whose tags matched.
    pub matched: u64,
    /// Alerts appended to the outbound stream.
    pub published: u64,
    /// Matched alerts that could not be appended.
    pub lost: u64,
    /// Tasks that panicked or could not be scheduled.
    pub task_failures: u64,
    /// Most task handles held at once during the pass.
    pub peak_pending: u64,
    /// A subscriber query failed and later batches were skipped.
    pub aborted: bool,
}

/// Drives subscriber pagination and fans matching out to the worker pool.
pub struct DispatchScheduler {
    subscribers: Arc<dyn SubscriberSource>,
    publisher: AlertPublisher,
    pool: WorkerPool,
    batch_size: usize,
    stats: Arc<PipelineStats>,
}

impl DispatchScheduler {
    pub fn new(
        subscribers: Arc<dyn SubscriberSource>,
        publisher: AlertPublisher,
        pool: WorkerPool,
        batch_size: usize,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            subscribers,
            publisher,
            pool,
            batch_size: batch_size.max(1),
            stats,
        }
    }

    /// Runs a full pass for `event` and waits for all of its tasks.
    ///
    /// A subscriber query failure stops the traversal: subscribers in later
    /// batches are not considered for this event, while tasks already
    /// submitted still run to completion. Individual task failures are
    /// counted and never affect other tasks.
    pub async fn dispatch(&self, event: &InboundEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        if event.tags.is_empty() {
            return report;
        }

        let event = Arc::new(event.clone());
        let mut group = TaskGroup::new();
        let mut last_id = SubscriberId::MIN;

        loop {
            let source = self.subscribers.clone();
            let limit = self.batch_size;
            let result =
                tokio::task::spawn_blocking(move || source.next_batch(last_id, limit)).await;

            let batch = match result {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    tracing::error!(last_id, error = %e, "subscriber query failed, aborting pass");
                    report.aborted = true;
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        last_id,
                        error = %e,
                        "subscriber query task failed, aborting pass"
                    );
                    report.aborted = true;
                    break;
                }
            };

            let Some(last) = batch.last() else {
                break;
            };
            last_id = last.id;

            let size = batch.len() as u64;
            report.visited += size;
            self.stats.record_visited(size);

            for subscriber in batch {
                let subscriber_id = subscriber.id;
                let task = deliver(event.clone(), subscriber, self.publisher.clone());
                match self.pool.submit(task).await {
                    Ok(handle) => group.push(handle),
                    Err(e) => {
                        tracing::error!(
                            subscriber_id,
                            error = %e,
                            "failed to schedule dispatch task"
                        );
                        report.task_failures += 1;
                    }
                }

                report.peak_pending = report.peak_pending.max(group.len() as u64);
                for result in group.drain_finished() {
                    self.tally(&mut report, result);
                }
            }
        }

        for result in group.join_all().await {
            self.tally(&mut report, result);
        }

        if report.aborted {
            self.stats.record_aborted();
        }

        tracing::info!(
            visited = report.visited,
            matched = report.matched,
            published = report.published,
            lost = report.lost,
            task_failures = report.task_failures,
            aborted = report.aborted,
            "dispatch pass complete"
        );

        report
    }

    fn tally(&self, report: &mut DispatchReport, result: Result<Delivery, TaskError>) {
        match result {
            Ok(Delivery::NotMatched) => {}
            Ok(Delivery::Sent) => {
                report.matched += 1;
                report.published += 1;
                self.stats.record_published();
            }
            Ok(Delivery::Lost) => {
                report.matched += 1;
                report.lost += 1;
                self.stats.record_lost();
            }
            Err(e) => {
                tracing::error!(error = %e, "dispatch task failed");
                report.task_failures += 1;
            }
        }
    }
}

/// Matches one subscriber and publishes on success.
async fn deliver(
    event: Arc<InboundEvent>,
    subscriber: Subscriber,
    publisher: AlertPublisher,
) -> Delivery {
    if !herald_match::matches(
        &event.tags,
        &subscriber.general_tags,
        &subscriber.specific_tags,
    ) {
        return Delivery::NotMatched;
    }

    let subscriber_id = subscriber.id;
    let result =
        tokio::task::spawn_blocking(move || publisher.publish(subscriber_id, &event.text)).await;

    match result {
        Ok(Ok(_)) => Delivery::Sent,
        Ok(Err(e)) => {
            tracing::warn!(subscriber_id, error = %e, "alert lost");
            Delivery::Lost
        }
        Err(e) => {
            tracing::error!(subscriber_id, error = %e, "publish task failed, alert lost");
            Delivery::Lost
        }
    }
}
