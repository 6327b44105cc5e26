//! In-process job queue with a worker pool and bounded retries.
//!
//! Jobs live only in memory and are lost on restart, which is acceptable for
//! best-effort replication such as the like audit record.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use geofeed_core::ports::{Job, JobHandler, JobQueue, JobQueueError, JobResult, QueueStats};

#[derive(Debug, Clone)]
pub struct InMemoryJobQueueConfig {
    /// Channel capacity; enqueue fails once this many jobs are waiting.
    pub max_size: usize,
    pub workers: usize,
    /// Base delay before a retry, multiplied by the attempt number.
    pub retry_backoff: Duration,
}

impl Default for InMemoryJobQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            workers: 4,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

impl InMemoryJobQueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: std::env::var("JOB_QUEUE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            workers: std::env::var("JOB_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.workers),
            ..defaults
        }
    }
}

#[derive(Default)]
struct JobStats {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

pub struct InMemoryJobQueue {
    stats: Arc<JobStats>,
    config: InMemoryJobQueueConfig,
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl InMemoryJobQueue {
    pub fn new(config: InMemoryJobQueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_size.max(1));

        Self {
            stats: Arc::new(JobStats::default()),
            config,
            sender: tx,
            receiver: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn from_env() -> Self {
        Self::new(InMemoryJobQueueConfig::from_env())
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new(InMemoryJobQueueConfig::default())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => JobQueueError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => {
                JobQueueError::EnqueueError("queue closed".to_string())
            }
        })?;

        let pending = self.stats.pending.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(pending, "Job enqueued");
        Ok(())
    }

    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError> {
        for worker_id in 0..self.config.workers.max(1) {
            let handler = handler.clone();
            let receiver = self.receiver.clone();
            let stats = self.stats.clone();
            let sender = self.sender.clone();
            let backoff = self.config.retry_backoff;

            tokio::spawn(async move {
                tracing::info!(worker_id, "Job worker started");

                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(mut job) = job else {
                        tracing::info!(worker_id, "Job worker shutting down");
                        break;
                    };

                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                    stats.processing.fetch_add(1, Ordering::Relaxed);
                    job.attempts += 1;

                    tracing::debug!(
                        worker_id,
                        job_id = %job.id,
                        job_type = %job.job_type,
                        attempt = job.attempts,
                        "Processing job"
                    );

                    let result = handler(job.clone()).await;
                    stats.processing.fetch_sub(1, Ordering::Relaxed);

                    match result {
                        JobResult::Success => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        JobResult::Retry(reason) if job.attempts < job.max_attempts => {
                            tracing::warn!(
                                job_id = %job.id,
                                attempt = job.attempts,
                                max_attempts = job.max_attempts,
                                reason = %reason,
                                "Job failed, will retry"
                            );
                            stats.pending.fetch_add(1, Ordering::Relaxed);
                            let sender = sender.clone();
                            let stats = stats.clone();
                            let delay = backoff * job.attempts;
                            tokio::spawn(async move {
                                tokio::time::sleep(delay).await;
                                if let Err(e) = sender.send(job).await {
                                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                                    stats.failed.fetch_add(1, Ordering::Relaxed);
                                    tracing::error!(error = %e, "Failed to re-enqueue job for retry");
                                }
                            });
                        }
                        JobResult::Retry(reason) | JobResult::Failed(reason) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(
                                job_id = %job.id,
                                job_type = %job.job_type,
                                attempts = job.attempts,
                                reason = %reason,
                                "Job failed permanently"
                            );
                        }
                    }
                }
            });
        }

        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, JobQueueError> {
        Ok(QueueStats {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processing: self.stats.processing.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        })
    }
}
