//! Renders one narrated clip from a slice of the shared footage.
//!
//! Every render is a single ffmpeg process. Each part of the segment is read
//! through its own input-seeked handle of the footage file, so the two halves
//! of a wrapped segment never share decoder state. The video parts are
//! concatenated, the footage audio is attenuated and the narration is mixed
//! on top at its original volume, starting at zero.

use super::cmd::{stderr_tail, FfmpegRunner};
use crate::domain::jobs::NarrationClip;
use crate::domain::timeline::{FootageTimeline, Segment, TimeRange};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_ATTENUATION: f64 = 0.25;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComposeError {
    #[error("footage {path} is unavailable: {reason}")]
    FootageUnavailable { path: PathBuf, reason: String },
    #[error("rendering {output} failed: {reason}")]
    RenderFailure { output: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct CompositorSettings {
    /// Multiplier applied to the footage's own audio, in `0.0..=1.0`
    pub attenuation: f64,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            attenuation: DEFAULT_ATTENUATION,
            video_codec: String::from("libx264"),
            audio_codec: String::from("aac"),
        }
    }
}

pub struct Compositor<R> {
    runner: R,
    settings: CompositorSettings,
}

impl<R: FfmpegRunner> Compositor<R> {
    pub fn new(runner: R, settings: CompositorSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    pub async fn render(
        &self,
        footage: &FootageTimeline,
        segment: &Segment,
        narration: &NarrationClip,
        output: &Path,
    ) -> Result<(), ComposeError> {
        match tokio::fs::metadata(&footage.path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(ComposeError::FootageUnavailable {
                    path: footage.path.clone(),
                    reason: String::from("not a regular file"),
                })
            }
            Err(e) => {
                return Err(ComposeError::FootageUnavailable {
                    path: footage.path.clone(),
                    reason: e.to_string(),
                })
            }
        }

        let render_failure = |reason: String| ComposeError::RenderFailure {
            output: output.to_path_buf(),
            reason,
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| render_failure(e.to_string()))?;
        }

        let args = build_render_args(footage, segment, narration, output, &self.settings);
        debug!(?args, "running ffmpeg");

        let result = self
            .runner
            .run_ffmpeg(args)
            .await
            .map_err(|e| render_failure(format!("could not run ffmpeg: {}", e)))?;

        if !result.status.success() {
            return Err(render_failure(stderr_tail(&result)));
        }

        info!(
            output = %output.display(),
            wrapped = segment.is_wrapped(),
            duration = narration.duration,
            "clip rendered"
        );
        Ok(())
    }
}

/// Full ffmpeg argument list for one render.
pub fn build_render_args(
    footage: &FootageTimeline,
    segment: &Segment,
    narration: &NarrationClip,
    output: &Path,
    settings: &CompositorSettings,
) -> Vec<String> {
    let parts = playable_parts(segment);
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for part in &parts {
        args.extend(footage_input(&footage.path, part));
    }
    args.push("-i".into());
    args.push(narration.audio_path.to_string_lossy().into_owned());

    args.push("-filter_complex".into());
    args.push(build_filter_graph(parts.len(), footage.has_audio, settings.attenuation));

    args.extend(
        [
            "-map",
            "[v]",
            "-map",
            "[a]",
            "-c:v",
            settings.video_codec.as_str(),
            "-c:a",
            settings.audio_codec.as_str(),
            "-t",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(seconds(narration.duration));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn footage_input(path: &Path, part: &TimeRange) -> Vec<String> {
    vec![
        "-ss".into(),
        seconds(part.start),
        "-t".into(),
        seconds(part.len()),
        "-i".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Filter graph for `part_count` footage inputs followed by the narration.
/// Produces the `[v]` and `[a]` output pads.
pub fn build_filter_graph(part_count: usize, footage_audio: bool, attenuation: f64) -> String {
    let narration = part_count;
    let mut filters = Vec::new();

    let background = if part_count == 1 {
        filters.push("[0:v]null[v]".to_string());
        footage_audio.then(|| "[0:a]".to_string())
    } else {
        let mut inputs = String::new();
        for i in 0..part_count {
            inputs.push_str(&format!("[{i}:v]"));
            if footage_audio {
                inputs.push_str(&format!("[{i}:a]"));
            }
        }
        if footage_audio {
            filters.push(format!("{inputs}concat=n={part_count}:v=1:a=1[v][fa]"));
            Some("[fa]".to_string())
        } else {
            filters.push(format!("{inputs}concat=n={part_count}:v=1:a=0[v]"));
            None
        }
    };

    match background {
        Some(label) => {
            filters.push(format!("{label}volume={attenuation}[bg]"));
            filters.push(format!(
                "[bg][{narration}:a]amix=inputs=2:duration=longest:dropout_transition=0:normalize=0[a]"
            ));
        }
        None => filters.push(format!("[{narration}:a]anull[a]")),
    }

    filters.join(";")
}

fn seconds(value: f64) -> String {
    format!("{:.3}", value)
}

/// Segment parts that survive millisecond rounding. A wrap a hair before the
/// end of the footage would otherwise become an empty `-t 0.000` input.
fn playable_parts(segment: &Segment) -> Vec<TimeRange> {
    let parts = segment.parts();
    let playable: Vec<TimeRange> = parts
        .iter()
        .copied()
        .filter(|part| seconds(part.len()) != seconds(0.0))
        .collect();
    if playable.is_empty() {
        parts.into_iter().take(1).collect()
    } else {
        playable
    }
}
