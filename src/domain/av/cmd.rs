use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Runs the ffmpeg tool family as subprocesses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FfmpegRunner: Send + Sync {
    async fn run_ffmpeg(&self, args: Vec<String>) -> io::Result<Output>;
    async fn run_ffprobe(&self, media_path: &Path) -> io::Result<Output>;
}

#[derive(Debug, Clone)]
pub struct RealFfmpegRunner {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl RealFfmpegRunner {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Resolve both binaries on PATH, falling back to the bare names.
    pub fn from_path() -> Self {
        let lookup = |name: &str| {
            which::which(name)
                .map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
        };
        Self::new(lookup("ffmpeg"), lookup("ffprobe"))
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }
}

#[async_trait]
impl FfmpegRunner for RealFfmpegRunner {
    async fn run_ffmpeg(&self, args: Vec<String>) -> io::Result<Output> {
        TokioCommand::new(&self.ffmpeg_path)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
    }

    async fn run_ffprobe(&self, media_path: &Path) -> io::Result<Output> {
        TokioCommand::new(&self.ffprobe_path)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration:stream=codec_type")
            .arg("-of")
            .arg("json")
            .arg(media_path)
            .output()
            .await
    }
}

/// Last few lines of a process' stderr, for error messages.
pub(crate) fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}
