use super::worker::WorkerService;
use crate::adapters::local::MemoryQueue;
use crate::domain::admission::AdmissionFilter;
use crate::domain::av::cmd::FfmpegRunner;
use crate::domain::av::compositor::{ComposeError, Compositor};
use crate::domain::av::probe::MediaProbe;
use crate::domain::jobs::{ItemError, ItemJob, ItemOutcome, ItemReport, OutputSink, RunSummary};
use crate::domain::timeline::{AllocError, FootageTimeline, TimelineAllocator};
use crate::ports::queue::{JobQueuePort, QueueError};
use crate::ports::source::{ContentSource, SourceError};
use crate::ports::synthesizer::NarrationSynthesizer;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

pub const DEFAULT_WORKERS: usize = 24;

/// Failures that abort a whole run before any item is processed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("content source failed: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Footage(#[from] ComposeError),
    #[error(transparent)]
    Timeline(#[from] AllocError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Probe the footage once for the whole run.
pub async fn load_footage(
    path: &Path,
    probe: &impl MediaProbe,
) -> Result<FootageTimeline, RunError> {
    FootageTimeline::probe(path, probe).await.map_err(|e| {
        RunError::Footage(ComposeError::FootageUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

pub struct OrchestratorService<N, R> {
    synthesizer: Arc<N>,
    compositor: Arc<Compositor<R>>,
    admission: AdmissionFilter,
    sink: OutputSink,
    start_offset: f64,
    cancel: CancellationToken,
}

impl<N, R> OrchestratorService<N, R>
where
    N: NarrationSynthesizer + 'static,
    R: FfmpegRunner + 'static,
{
    pub fn new(
        synthesizer: N,
        compositor: Compositor<R>,
        admission: AdmissionFilter,
        sink: OutputSink,
    ) -> Self {
        Self {
            synthesizer: Arc::new(synthesizer),
            compositor: Arc::new(compositor),
            admission,
            sink,
            start_offset: 0.0,
            cancel: CancellationToken::new(),
        }
    }

    /// Position on the footage where the first allocation starts.
    pub fn with_start_offset(mut self, seconds: f64) -> Self {
        self.start_offset = seconds;
        self
    }

    /// Token that stops the run between pipeline stages once cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch the batch from `source`, then [`OrchestratorService::run`] it.
    /// A source failure aborts before any worker starts.
    pub async fn run_from_source(
        &self,
        source: &dyn ContentSource,
        limit: usize,
        footage: FootageTimeline,
        width: usize,
    ) -> Result<RunSummary, RunError> {
        let items = source.fetch(limit).await?;
        info!(items = items.len(), "fetched batch");
        self.run(footage, items, width).await
    }

    /// Process every item across at most `width` concurrent workers.
    /// Returns once each item has succeeded, been skipped or failed.
    pub async fn run(
        &self,
        footage: FootageTimeline,
        items: Vec<String>,
        width: usize,
    ) -> Result<RunSummary, RunError> {
        let run_id = Uuid::new_v4();
        let allocator = Arc::new(TimelineAllocator::starting_at(
            footage.duration,
            self.start_offset,
        )?);

        let total = items.len();
        let queue = Arc::new(MemoryQueue::new());
        for (i, text) in items.into_iter().enumerate() {
            let index = i + 1;
            let job = ItemJob {
                index,
                text,
                output_path: self.sink.path_for(index),
            };
            queue.enqueue_job(job).await?;
        }
        queue.seal();

        let width = width.max(1).min(total);
        let span = info_span!("run", %run_id);
        info!(
            parent: &span,
            items = total,
            width,
            footage = %footage.path.display(),
            footage_duration = footage.duration,
            "starting run"
        );

        let worker = Arc::new(WorkerService::new(
            self.synthesizer.clone(),
            self.compositor.clone(),
            Arc::new(footage),
            allocator,
            self.admission,
            self.cancel.clone(),
        ));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles: Vec<_> = (0..width)
            .map(|worker_id| {
                let worker = worker.clone();
                let queue = queue.clone();
                let tx = tx.clone();
                tokio::spawn(
                    async move { worker.run_worker_loop(worker_id, queue.as_ref(), tx).await }
                        .instrument(span.clone()),
                )
            })
            .collect();
        drop(tx);

        let mut reports = Vec::with_capacity(total);
        while let Some(report) = rx.recv().await {
            reports.push(report);
        }

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(parent: &span, error = %e, "worker task terminated abnormally");
            }
        }

        let reported: HashSet<usize> = reports.iter().map(|r| r.index).collect();
        for index in (1..=total).filter(|index| !reported.contains(index)) {
            reports.push(ItemReport {
                index,
                outcome: ItemOutcome::Failed(ItemError::WorkerLost(String::from(
                    "no report received for item",
                ))),
            });
        }

        let summary = RunSummary::from_reports(run_id, reports);
        info!(
            parent: &span,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::av::cmd::test_support::mock_output;
    use crate::domain::av::cmd::MockFfmpegRunner;
    use crate::domain::av::compositor::CompositorSettings;
    use crate::domain::jobs::NarrationClip;
    use crate::domain::timeline::Segment;
    use crate::ports::synthesizer::{MockNarrationSynthesizer, SynthesisError};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tempfile::{tempdir, NamedTempFile, TempDir};

    struct Fixture {
        footage_file: NamedTempFile,
        out_dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                footage_file: NamedTempFile::new().unwrap(),
                out_dir: tempdir().unwrap(),
            }
        }

        fn footage(&self, duration: f64) -> FootageTimeline {
            FootageTimeline {
                path: self.footage_file.path().to_path_buf(),
                duration,
                has_audio: true,
            }
        }

        fn sink(&self) -> OutputSink {
            let prefix = self.out_dir.path().join("output");
            OutputSink::new(prefix.to_string_lossy(), "mp4")
        }
    }

    fn clip(index: usize, duration: f64) -> NarrationClip {
        NarrationClip {
            audio_path: PathBuf::from(format!("/nonexistent/narration_{}.wav", index)),
            duration,
        }
    }

    fn synthesizer_with(durations: Vec<f64>) -> MockNarrationSynthesizer {
        let mut synth = MockNarrationSynthesizer::new();
        synth
            .expect_synthesize()
            .returning(move |index, _| Ok(clip(index, durations[index - 1])));
        synth
    }

    fn succeeding_runner() -> MockFfmpegRunner {
        let mut runner = MockFfmpegRunner::new();
        runner
            .expect_run_ffmpeg()
            .returning(|_| Ok(mock_output("", "", true)));
        runner
    }

    fn items(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("post number {}", i)).collect()
    }

    #[tokio::test]
    async fn test_admission_ceiling_scenario() {
        let fixture = Fixture::new();
        let orchestrator = OrchestratorService::new(
            synthesizer_with(vec![10.0, 57.5, 58.0]),
            Compositor::new(succeeding_runner(), CompositorSettings::default()),
            AdmissionFilter::new(58.0),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(100.0), items(3), DEFAULT_WORKERS)
            .await
            .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert!(matches!(
            summary.report(3).unwrap().outcome,
            ItemOutcome::Skipped { duration, .. } if duration == 58.0
        ));
    }

    #[tokio::test]
    async fn test_outputs_are_named_by_index_and_tile_the_footage() {
        let fixture = Fixture::new();
        let orchestrator = OrchestratorService::new(
            synthesizer_with(vec![10.0, 57.5, 20.0]),
            Compositor::new(succeeding_runner(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(100.0), items(3), 2)
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 3);

        let mut segments = Vec::new();
        for report in &summary.reports {
            match &report.outcome {
                ItemOutcome::Succeeded(job) => {
                    let expected = fixture
                        .out_dir
                        .path()
                        .join(format!("output{}.mp4", report.index));
                    assert_eq!(job.output_path, expected);
                    assert_eq!(job.segment.duration(), job.narration.duration);
                    segments.push(job.segment);
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        // 10 + 57.5 + 20 fits in 100s, so the slices are contiguous and back to back
        let mut ranges: Vec<_> = segments
            .iter()
            .map(|s| match s {
                Segment::Contiguous(range) => *range,
                other => panic!("unexpected wrap: {:?}", other),
            })
            .collect();
        ranges.sort_by(|a, b| a.start.total_cmp(&b.start));
        assert_eq!(ranges[0].start, 0.0);
        assert_eq!(ranges[1].start, ranges[0].end);
        assert_eq!(ranges[2].start, ranges[1].end);
        assert_eq!(ranges[2].end, 87.5);
    }

    #[tokio::test]
    async fn test_render_failure_is_isolated() {
        let fixture = Fixture::new();
        let mut runner = MockFfmpegRunner::new();
        runner.expect_run_ffmpeg().returning(|args| {
            let failing = args.last().map_or(false, |out| out.ends_with("output2.mp4"));
            if failing {
                Ok(mock_output("", "Conversion failed!", false))
            } else {
                Ok(mock_output("", "", true))
            }
        });

        let orchestrator = OrchestratorService::new(
            synthesizer_with(vec![10.0, 12.0, 14.0]),
            Compositor::new(runner, CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(100.0), items(3), 3)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        match &summary.report(2).unwrap().outcome {
            ItemOutcome::Failed(e) => assert_eq!(e.kind(), "render_failure"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(matches!(summary.report(1).unwrap().outcome, ItemOutcome::Succeeded(_)));
        assert!(matches!(summary.report(3).unwrap().outcome, ItemOutcome::Succeeded(_)));
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_isolated() {
        let fixture = Fixture::new();
        let mut synth = MockNarrationSynthesizer::new();
        synth.expect_synthesize().returning(|index, _| {
            if index == 1 {
                Err(SynthesisError::EmptyText)
            } else {
                Ok(clip(index, 5.0))
            }
        });

        let orchestrator = OrchestratorService::new(
            synth,
            Compositor::new(succeeding_runner(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(30.0), items(4), 2)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        match &summary.report(1).unwrap().outcome {
            ItemOutcome::Failed(e) => assert_eq!(e.kind(), "synthesis_failure"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_reaches_terminal_state() {
        let fixture = Fixture::new();
        let mut runner = MockFfmpegRunner::new();
        runner.expect_run_ffmpeg().times(0);
        let mut synth = MockNarrationSynthesizer::new();
        synth.expect_synthesize().times(0);

        let orchestrator = OrchestratorService::new(
            synth,
            Compositor::new(runner, CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );
        orchestrator.cancellation_token().cancel();

        let summary = orchestrator
            .run(fixture.footage(100.0), items(5), 2)
            .await
            .unwrap();

        assert_eq!(summary.failed, 5);
        assert!(summary
            .reports
            .iter()
            .all(|r| matches!(&r.outcome, ItemOutcome::Failed(ItemError::Cancelled))));
    }

    /// Panics while synthesizing one chosen item.
    struct PanickingSynthesizer {
        poisoned_index: usize,
    }

    #[async_trait]
    impl NarrationSynthesizer for PanickingSynthesizer {
        async fn synthesize(
            &self,
            index: usize,
            _text: &str,
        ) -> Result<NarrationClip, SynthesisError> {
            if index == self.poisoned_index {
                panic!("synthesizer crashed on item {}", index);
            }
            Ok(clip(index, 3.0))
        }
    }

    #[tokio::test]
    async fn test_lost_worker_is_reported_as_failure() {
        let fixture = Fixture::new();
        let orchestrator = OrchestratorService::new(
            PanickingSynthesizer { poisoned_index: 2 },
            Compositor::new(succeeding_runner(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(100.0), items(4), 2)
            .await
            .unwrap();

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.succeeded, 3);
        match &summary.report(2).unwrap().outcome {
            ItemOutcome::Failed(e) => assert_eq!(e.kind(), "worker_lost"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_degenerate_footage_aborts_run() {
        let fixture = Fixture::new();
        let mut synth = MockNarrationSynthesizer::new();
        synth.expect_synthesize().times(0);

        let orchestrator = OrchestratorService::new(
            synth,
            Compositor::new(MockFfmpegRunner::new(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let err = orchestrator
            .run(fixture.footage(0.0), items(2), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Timeline(AllocError::DegenerateTimeline(_))));
    }

    struct FailingSource;

    #[async_trait]
    impl ContentSource for FailingSource {
        async fn fetch(&self, _limit: usize) -> Result<Vec<String>, SourceError> {
            Err(SourceError::Status {
                url: "https://old.reddit.com/r/askreddit/hot/".into(),
                status: 503,
            })
        }
    }

    #[tokio::test]
    async fn test_source_failure_aborts_before_dispatch() {
        let fixture = Fixture::new();
        let mut synth = MockNarrationSynthesizer::new();
        synth.expect_synthesize().times(0);

        let orchestrator = OrchestratorService::new(
            synth,
            Compositor::new(MockFfmpegRunner::new(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let err = orchestrator
            .run_from_source(&FailingSource, 10, fixture.footage(100.0), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Source(SourceError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fixture = Fixture::new();
        let orchestrator = OrchestratorService::new(
            MockNarrationSynthesizer::new(),
            Compositor::new(MockFfmpegRunner::new(), CompositorSettings::default()),
            AdmissionFilter::default(),
            fixture.sink(),
        );

        let summary = orchestrator
            .run(fixture.footage(100.0), Vec::new(), DEFAULT_WORKERS)
            .await
            .unwrap();
        assert_eq!(summary.total(), 0);
    }
}
