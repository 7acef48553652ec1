use super::cmd::{stderr_tail, FfmpegRunner};
use crate::domain::timeline::FootageTimeline;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not run probe on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("probe failed for {path}: {stderr}")]
    Failed { path: PathBuf, stderr: String },
    #[error("unreadable probe output for {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration: f64,
    pub has_audio: bool,
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError>;
}

impl FootageTimeline {
    pub async fn probe(path: &Path, probe: &impl MediaProbe) -> Result<Self, ProbeError> {
        let info = probe.probe(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            duration: info.duration,
            has_audio: info.has_audio,
        })
    }
}

/// Probes through the `ffprobe` binary.
pub struct FfprobeProbe<R> {
    runner: R,
}

impl<R: FfmpegRunner> FfprobeProbe<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: FfmpegRunner> MediaProbe for FfprobeProbe<R> {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        let output = self
            .runner
            .run_ffprobe(path)
            .await
            .map_err(|source| ProbeError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.to_path_buf(),
                stderr: stderr_tail(&output),
            });
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            ProbeError::Malformed {
                path: path.to_path_buf(),
                reason,
            }
        })
    }
}

/// Parse `ffprobe -show_entries format=duration:stream=codec_type -of json`.
pub(crate) fn parse_probe_json(stdout: &str) -> Result<MediaInfo, String> {
    let v: Value = serde_json::from_str(stdout).map_err(|e| e.to_string())?;

    // ffprobe prints durations as strings
    let duration = v
        .get("format")
        .and_then(|format| format.get("duration"))
        .and_then(|duration| match duration {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        })
        .ok_or_else(|| "missing format duration".to_string())?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(format!("non-positive duration {}", duration));
    }

    let has_audio = v
        .get("streams")
        .and_then(|streams| streams.as_array())
        .map(|streams| {
            streams
                .iter()
                .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"))
        })
        .unwrap_or(false);

    Ok(MediaInfo {
        duration,
        has_audio,
    })
}

/// Probes in-process through libav.
#[cfg(feature = "libav")]
pub struct LibavProbe;

#[cfg(feature = "libav")]
#[async_trait]
impl MediaProbe for LibavProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, ProbeError> {
        use ffmpeg_next as ffmpeg;

        let path_clone = path.to_path_buf();
        let malformed = |reason: String| ProbeError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        tokio::task::spawn_blocking(move || -> Result<MediaInfo, String> {
            ffmpeg::init().map_err(|e| e.to_string())?;
            let context = ffmpeg::format::input(&path_clone).map_err(|e| e.to_string())?;

            let duration = context.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE);
            if !duration.is_finite() || duration <= 0.0 {
                return Err(format!("non-positive duration {}", duration));
            }
            let has_audio = context.streams().best(ffmpeg::media::Type::Audio).is_some();

            Ok(MediaInfo {
                duration,
                has_audio,
            })
        })
        .await
        .map_err(|e| malformed(e.to_string()))?
        .map_err(malformed)
    }
}
