use crate::domain::jobs::ItemJob;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,
}

#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Enqueue a job
    async fn enqueue_job(&self, job: ItemJob) -> Result<(), QueueError>;

    /// Take the next job, or `None` once the batch is drained
    async fn dequeue_job(&self) -> Result<Option<ItemJob>, QueueError>;
}
