use crate::domain::admission::{Admission, AdmissionFilter};
use crate::domain::av::cmd::FfmpegRunner;
use crate::domain::av::compositor::Compositor;
use crate::domain::jobs::{ItemError, ItemJob, ItemOutcome, ItemReport, NarrationClip, OutputJob};
use crate::domain::timeline::{FootageTimeline, TimelineAllocator};
use crate::ports::queue::JobQueuePort;
use crate::ports::synthesizer::NarrationSynthesizer;
use futures::FutureExt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Takes one item at a time through synthesize -> admit -> allocate -> render.
pub struct WorkerService<N, R> {
    synthesizer: Arc<N>,
    compositor: Arc<Compositor<R>>,
    footage: Arc<FootageTimeline>,
    allocator: Arc<TimelineAllocator>,
    admission: AdmissionFilter,
    cancel: CancellationToken,
}

impl<N, R> WorkerService<N, R>
where
    N: NarrationSynthesizer + 'static,
    R: FfmpegRunner + 'static,
{
    pub fn new(
        synthesizer: Arc<N>,
        compositor: Arc<Compositor<R>>,
        footage: Arc<FootageTimeline>,
        allocator: Arc<TimelineAllocator>,
        admission: AdmissionFilter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            synthesizer,
            compositor,
            footage,
            allocator,
            admission,
            cancel,
        }
    }

    /// Drain `queue`, reporting every item it takes. Returns once the queue is empty.
    pub async fn run_worker_loop<Q>(
        &self,
        worker_id: usize,
        queue: &Q,
        reports: mpsc::UnboundedSender<ItemReport>,
    ) where
        Q: JobQueuePort + ?Sized,
    {
        debug!(worker = worker_id, "worker started");
        loop {
            match queue.dequeue_job().await {
                Ok(Some(job)) => {
                    let outcome = self.process_item(&job, worker_id).await;
                    let report = ItemReport {
                        index: job.index,
                        outcome,
                    };
                    if reports.send(report).is_err() {
                        error!(worker = worker_id, "report channel closed, stopping");
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(worker = worker_id, error = %e, "queue error, stopping");
                    return;
                }
            }
        }
        debug!(worker = worker_id, "worker finished");
    }

    /// Run one item to a terminal state. Never fails: errors become outcomes.
    pub async fn process_item(&self, job: &ItemJob, worker_id: usize) -> ItemOutcome {
        match self.pipeline(job, worker_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    index = job.index,
                    worker = worker_id,
                    kind = e.kind(),
                    error = %e,
                    "item failed"
                );
                ItemOutcome::Failed(e)
            }
        }
    }

    async fn pipeline(&self, job: &ItemJob, worker_id: usize) -> Result<ItemOutcome, ItemError> {
        self.ensure_active()?;
        let narration = self.synthesizer.synthesize(job.index, &job.text).await?;

        let outcome = AssertUnwindSafe(self.admit_and_render(job, &narration, worker_id))
            .catch_unwind()
            .await;

        // The narration is only needed until the clip is rendered.
        let _ = tokio::fs::remove_file(&narration.audio_path).await;
        match outcome {
            Ok(outcome) => outcome,
            Err(panic) => panic::resume_unwind(panic),
        }
    }

    async fn admit_and_render(
        &self,
        job: &ItemJob,
        narration: &NarrationClip,
        worker_id: usize,
    ) -> Result<ItemOutcome, ItemError> {
        if self.admission.admit(narration.duration) == Admission::Skip {
            info!(
                index = job.index,
                duration = narration.duration,
                ceiling = self.admission.ceiling(),
                "narration too long, skipping"
            );
            return Ok(ItemOutcome::Skipped {
                duration: narration.duration,
                ceiling: self.admission.ceiling(),
            });
        }
        info!(
            index = job.index,
            worker = worker_id,
            duration = narration.duration,
            "narration admitted"
        );

        self.ensure_active()?;
        let segment = self.allocator.allocate(narration.duration)?;
        debug!(index = job.index, ?segment, "footage allocated");

        self.ensure_active()?;
        self.compositor
            .render(&self.footage, &segment, narration, &job.output_path)
            .await?;

        Ok(ItemOutcome::Succeeded(OutputJob {
            index: job.index,
            segment,
            narration: narration.clone(),
            output_path: job.output_path.clone(),
        }))
    }

    fn ensure_active(&self) -> Result<(), ItemError> {
        if self.cancel.is_cancelled() {
            Err(ItemError::Cancelled)
        } else {
            Ok(())
        }
    }
}
