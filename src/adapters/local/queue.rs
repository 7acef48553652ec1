//! In-memory JobQueuePort for a pre-sized batch.

use crate::domain::jobs::ItemJob;
use crate::ports::queue::{JobQueuePort, QueueError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<VecDeque<ItemJob>>,
    sealed: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Refuse further jobs. Jobs already queued can still be taken.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }
}

#[async_trait]
impl JobQueuePort for MemoryQueue {
    async fn enqueue_job(&self, job: ItemJob) -> Result<(), QueueError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        self.jobs.lock().await.push_back(job);
        Ok(())
    }

    async fn dequeue_job(&self) -> Result<Option<ItemJob>, QueueError> {
        Ok(self.jobs.lock().await.pop_front())
    }
}
