//! Job queue port - bounded background work with retry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A unit of background work routed by `job_type`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    /// Attempts made so far.
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Serialize `payload` into a new job.
    pub fn new<T: Serialize>(
        job_type: impl Into<String>,
        payload: &T,
    ) -> Result<Self, JobQueueError> {
        let payload =
            serde_json::to_value(payload).map_err(|e| JobQueueError::Payload(e.to_string()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            payload,
            attempts: 0,
            max_attempts: 3,
            created_at: Utc::now(),
        })
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, JobQueueError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| JobQueueError::Payload(e.to_string()))
    }
}

/// Result of job processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success,
    /// Transient failure; retried until `max_attempts`.
    Retry(String),
    /// Permanent failure.
    Failed(String),
}

/// Shared, type-erased job handler.
pub type JobHandler =
    Arc<dyn Fn(Job) -> Pin<Box<dyn Future<Output = JobResult> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`JobHandler`].
pub fn job_handler<F, Fut>(f: F) -> JobHandler
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobResult> + Send + 'static,
{
    Arc::new(
        move |job: Job| -> Pin<Box<dyn Future<Output = JobResult> + Send>> { Box::pin(f(job)) },
    )
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue without waiting for processing. Fails fast when the queue is full.
    async fn enqueue(&self, job: Job) -> Result<(), JobQueueError>;

    /// Spawn the worker pool that feeds jobs to `handler`.
    async fn start_worker(&self, handler: JobHandler) -> Result<(), JobQueueError>;

    async fn stats(&self) -> Result<QueueStats, JobQueueError>;
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum JobQueueError {
    #[error("Failed to enqueue job: {0}")]
    EnqueueError(String),

    #[error("Queue is full")]
    QueueFull,

    #[error("Invalid job payload: {0}")]
    Payload(String),
}
