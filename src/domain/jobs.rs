use super::av::compositor::ComposeError;
use super::timeline::{AllocError, Segment};
use crate::ports::synthesizer::SynthesisError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// One text item waiting for a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemJob {
    /// 1-based position in the submitted batch, never reassigned
    pub index: usize,
    pub text: String,
    pub output_path: PathBuf,
}

/// Synthesized narration for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationClip {
    pub audio_path: PathBuf,
    /// Duration in seconds, always positive
    pub duration: f64,
}

/// A rendered item.
#[derive(Debug, Clone, Serialize)]
pub struct OutputJob {
    pub index: usize,
    pub segment: Segment,
    pub narration: NarrationClip,
    pub output_path: PathBuf,
}

/// Names output artifacts `<prefix><index>.<extension>`.
#[derive(Debug, Clone)]
pub struct OutputSink {
    pub prefix: String,
    pub extension: String,
}

impl OutputSink {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.{}", self.prefix, index, self.extension))
    }
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Allocation(#[from] AllocError),
    #[error(transparent)]
    Render(#[from] ComposeError),
    #[error("cancelled before completion")]
    Cancelled,
    #[error("worker stopped before reporting: {0}")]
    WorkerLost(String),
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Synthesis(_) => "synthesis_failure",
            ItemError::Allocation(AllocError::InvalidDuration(_)) => "invalid_duration",
            ItemError::Allocation(AllocError::DegenerateTimeline(_)) => "degenerate_timeline",
            ItemError::Render(ComposeError::FootageUnavailable { .. }) => "footage_unavailable",
            ItemError::Render(ComposeError::RenderFailure { .. }) => "render_failure",
            ItemError::Cancelled => "cancelled",
            ItemError::WorkerLost(_) => "worker_lost",
        }
    }
}

#[derive(Debug)]
pub enum ItemOutcome {
    Succeeded(OutputJob),
    /// Narration too long for the admission ceiling; a decision, not an error
    Skipped { duration: f64, ceiling: f64 },
    Failed(ItemError),
}

#[derive(Debug)]
pub struct ItemReport {
    pub index: usize,
    pub outcome: ItemOutcome,
}

/// Aggregated result of a run, ordered by item index.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub reports: Vec<ItemReport>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_reports(run_id: Uuid, mut reports: Vec<ItemReport>) -> Self {
        reports.sort_by_key(|report| report.index);

        let mut summary = Self {
            run_id,
            reports: Vec::new(),
            succeeded: 0,
            skipped: 0,
            failed: 0,
        };
        for report in &reports {
            match report.outcome {
                ItemOutcome::Succeeded(_) => summary.succeeded += 1,
                ItemOutcome::Skipped { .. } => summary.skipped += 1,
                ItemOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.reports = reports;
        summary
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn report(&self, index: usize) -> Option<&ItemReport> {
        self.reports.iter().find(|report| report.index == index)
    }
}
