//! Fixed-size worker pool for dispatch tasks.
//!
//! A pool owns `size` long-lived workers that pull jobs from one bounded
//! queue. A worker runs each job in its own spawned task and waits for it,
//! so at most `size` jobs execute at any moment and a panicking job never
//! takes its worker down. When every worker is busy and the queue is full,
//! [`WorkerPool::submit`] waits, which stalls whoever is feeding the pool.
//!
//! Callers collect [`TaskHandle`]s in a [`TaskGroup`] and await
//! [`TaskGroup::join_all`] as a barrier. Long-running producers call
//! [`TaskGroup::drain_finished`] between submissions so the group only
//! holds handles of tasks that are still queued or running.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::{JoinError, JoinHandle};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Failure of a single pooled task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The pool no longer accepts work.
    #[error("worker pool is shut down")]
    PoolClosed,

    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was cancelled or its worker went away before reporting.
    #[error("task was cancelled")]
    Cancelled,
}

impl From<JoinError> for TaskError {
    fn from(e: JoinError) -> Self {
        if !e.is_panic() {
            return Self::Cancelled;
        }
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

/// Completion handle for one submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    done: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Waits for the task to finish.
    pub async fn join(self) -> Result<T, TaskError> {
        self.done.await.unwrap_or(Err(TaskError::Cancelled))
    }

    /// Returns the result if the task has already finished.
    pub fn try_join(&mut self) -> Option<Result<T, TaskError>> {
        match self.done.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::Cancelled)),
        }
    }
}

/// Handles collected for one barrier.
#[derive(Debug)]
pub struct TaskGroup<T> {
    handles: Vec<TaskHandle<T>>,
}

impl<T> Default for TaskGroup<T> {
    fn default() -> Self {
        Self {
            handles: Vec::new(),
        }
    }
}

impl<T> TaskGroup<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handle: TaskHandle<T>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Removes every finished task from the group and returns its result,
    /// without waiting. Results keep submission order.
    pub fn drain_finished(&mut self) -> Vec<Result<T, TaskError>> {
        let mut finished = Vec::new();
        self.handles.retain_mut(|handle| match handle.try_join() {
            Some(result) => {
                finished.push(result);
                false
            }
            None => true,
        });
        finished
    }

    /// Waits for every task in the group. Results keep submission order.
    pub async fn join_all(self) -> Vec<Result<T, TaskError>> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            results.push(handle.join().await);
        }
        results
    }
}

/// A fixed number of workers consuming a bounded job queue.
pub struct WorkerPool {
    queue: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `size` workers (at least one) with a queue of the same depth.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (queue, rx) = mpsc::channel::<Job>(size);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..size)
            .map(|worker| tokio::spawn(worker_loop(worker, rx.clone())))
            .collect();

        tracing::debug!(size, "worker pool started");
        Self { queue, workers }
    }

    /// Number of workers, which is also the concurrency cap.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a task, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PoolClosed` if the workers have exited.
    pub async fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, TaskError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let result = tokio::spawn(task).await.map_err(TaskError::from);
            // The submitter may have stopped waiting.
            let _ = done_tx.send(result);
        });

        self.queue
            .send(job)
            .await
            .map_err(|_| TaskError::PoolClosed)?;
        Ok(TaskHandle { done })
    }

    /// Stops accepting work, lets queued jobs finish, and waits for every
    /// worker to exit.
    pub async fn shutdown(self) {
        drop(self.queue);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker exited abnormally");
            }
        }
    }
}

async fn worker_loop(worker: usize, rx: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = rx.lock().await.recv().await;
        match job {
            Some(job) => job.await,
            None => break,
        }
    }
    tracing::trace!(worker, "worker stopped");
}
