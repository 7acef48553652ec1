use crate::domain::av::probe::ProbeError;
use crate::domain::jobs::NarrationClip;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("nothing to narrate")]
    EmptyText,
    #[error("speech synthesizer could not run: {0}")]
    Io(#[from] std::io::Error),
    #[error("speech synthesizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("could not measure narration: {0}")]
    Probe(#[from] ProbeError),
}

/// Text-to-speech collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    /// Synthesize `text` for the item at `index` and measure its duration.
    async fn synthesize(&self, index: usize, text: &str) -> Result<NarrationClip, SynthesisError>;
}
