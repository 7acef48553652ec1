//! Narration through a command-line text-to-speech program.

use crate::domain::av::probe::MediaProbe;
use crate::domain::jobs::NarrationClip;
use crate::ports::synthesizer::{NarrationSynthesizer, SynthesisError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Default invocation for `espeak-ng`.
pub const DEFAULT_TTS_ARGS: &str = "-f {input} -w {output}";

/// Runs `program` once per item. `{input}` in the argument template is
/// replaced by a file holding the text, `{output}` by the audio path.
pub struct CommandSynthesizer<P> {
    program: String,
    args: Vec<String>,
    extension: String,
    workdir: PathBuf,
    probe: P,
}

impl<P: MediaProbe> CommandSynthesizer<P> {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        extension: impl Into<String>,
        workdir: impl Into<PathBuf>,
        probe: P,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            extension: extension.into(),
            workdir: workdir.into(),
            probe,
        }
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl<P: MediaProbe> NarrationSynthesizer for CommandSynthesizer<P> {
    async fn synthesize(&self, index: usize, text: &str) -> Result<NarrationClip, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        tokio::fs::create_dir_all(&self.workdir).await?;
        let text_path = self.workdir.join(format!("narration_{}.txt", index));
        let audio_path = self
            .workdir
            .join(format!("narration_{}.{}", index, self.extension));
        tokio::fs::write(&text_path, text).await?;

        let args = self.expand_args(&text_path, &audio_path);
        debug!(index, program = %self.program, ?args, "synthesizing narration");
        let result = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await;
        let _ = tokio::fs::remove_file(&text_path).await;
        let output = result?;

        if !output.status.success() {
            return Err(SynthesisError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info = self.probe.probe(&audio_path).await?;
        Ok(NarrationClip {
            audio_path,
            duration: info.duration,
        })
    }
}
