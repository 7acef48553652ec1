//! Run configuration, from the environment (and `.env`) or the command line.

use crate::adapters::local::tts::DEFAULT_TTS_ARGS;
use crate::application::orchestrator::DEFAULT_WORKERS;
use crate::domain::admission::{AdmissionFilter, DEFAULT_CEILING};
use crate::domain::av::cmd::RealFfmpegRunner;
use crate::domain::av::compositor::{CompositorSettings, DEFAULT_ATTENUATION};
use crate::domain::jobs::OutputSink;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("WORKERS must be at least 1")]
    NoWorkers,
    #[error("ITEM_LIMIT must be at least 1")]
    NoItems,
    #[error("ADMISSION_CEILING must be a positive number of seconds, got {0}")]
    Ceiling(f64),
    #[error("ATTENUATION must be within 0.0..=1.0, got {0}")]
    Attenuation(f64),
    #[error("START_OFFSET must be a finite, non-negative number of seconds, got {0}")]
    StartOffset(f64),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("TTS_ARGS must reference {{output}}")]
    TtsOutput,
}

/// Turns a batch of text posts into narrated short clips cut from one footage file.
#[derive(Parser, Clone, Debug)]
#[command(name = "reelcast", version)]
pub struct RunConfig {
    /// `r/<subreddit>`, `file:<path>` or a path to a text file (blank-line separated)
    #[arg(long, env = "SOURCE", default_value = "r/askreddit")]
    pub source: String,

    /// Maximum number of items to fetch
    #[arg(long, env = "ITEM_LIMIT", default_value_t = 100)]
    pub item_limit: usize,

    /// Footage shared by every output
    #[arg(long, env = "FOOTAGE_PATH", default_value = "footage.mp4")]
    pub footage_path: PathBuf,

    /// Outputs are written to `<prefix><index>.<extension>`
    #[arg(long, env = "OUTPUT_PREFIX", default_value = "output")]
    pub output_prefix: String,

    #[arg(long, env = "OUTPUT_EXTENSION", default_value = "mp4")]
    pub output_extension: String,

    /// Items processed concurrently
    #[arg(long, env = "WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Narrations this long or longer (seconds) are skipped
    #[arg(long, env = "ADMISSION_CEILING", default_value_t = DEFAULT_CEILING)]
    pub admission_ceiling: f64,

    /// Volume multiplier for the footage's own audio
    #[arg(long, env = "ATTENUATION", default_value_t = DEFAULT_ATTENUATION)]
    pub attenuation: f64,

    /// Where on the footage the first clip starts (seconds)
    #[arg(long, env = "START_OFFSET", default_value_t = 0.0)]
    pub start_offset: f64,

    #[arg(long, env = "TTS_PROGRAM", default_value = "espeak-ng")]
    pub tts_program: String,

    /// Argument template; `{input}` is the text file, `{output}` the audio file
    #[arg(long, env = "TTS_ARGS", default_value = DEFAULT_TTS_ARGS, allow_hyphen_values = true)]
    pub tts_args: String,

    #[arg(long, env = "TTS_EXTENSION", default_value = "wav")]
    pub tts_extension: String,

    /// Defaults to `ffmpeg` on PATH
    #[arg(long, env = "FFMPEG_PATH")]
    pub ffmpeg_path: Option<String>,

    /// Defaults to `ffprobe` on PATH
    #[arg(long, env = "FFPROBE_PATH")]
    pub ffprobe_path: Option<String>,

    #[arg(long, env = "VIDEO_CODEC", default_value = "libx264")]
    pub video_codec: String,

    #[arg(long, env = "AUDIO_CODEC", default_value = "aac")]
    pub audio_codec: String,

    /// Also write the run summary as JSON here
    #[arg(long, env = "SUMMARY_PATH")]
    pub summary_path: Option<PathBuf>,
}

impl RunConfig {
    /// Load `.env`, then parse flags with environment fallbacks.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.item_limit == 0 {
            return Err(ConfigError::NoItems);
        }
        if !(self.admission_ceiling.is_finite() && self.admission_ceiling > 0.0) {
            return Err(ConfigError::Ceiling(self.admission_ceiling));
        }
        if !(0.0..=1.0).contains(&self.attenuation) {
            return Err(ConfigError::Attenuation(self.attenuation));
        }
        if !(self.start_offset.is_finite() && self.start_offset >= 0.0) {
            return Err(ConfigError::StartOffset(self.start_offset));
        }

        let required = [
            ("SOURCE", &self.source),
            ("OUTPUT_EXTENSION", &self.output_extension),
            ("TTS_PROGRAM", &self.tts_program),
            ("TTS_EXTENSION", &self.tts_extension),
            ("VIDEO_CODEC", &self.video_codec),
            ("AUDIO_CODEC", &self.audio_codec),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Empty(*name));
        }

        if !self.tts_args.contains("{output}") {
            return Err(ConfigError::TtsOutput);
        }
        Ok(())
    }

    pub fn tts_args(&self) -> Vec<String> {
        self.tts_args.split_whitespace().map(String::from).collect()
    }

    pub fn sink(&self) -> OutputSink {
        OutputSink::new(&self.output_prefix, &self.output_extension)
    }

    pub fn admission(&self) -> AdmissionFilter {
        AdmissionFilter::new(self.admission_ceiling)
    }

    pub fn compositor_settings(&self) -> CompositorSettings {
        CompositorSettings {
            attenuation: self.attenuation,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
        }
    }

    /// Explicit tool paths win; missing ones are looked up on PATH.
    pub fn ffmpeg_runner(&self) -> RealFfmpegRunner {
        match (&self.ffmpeg_path, &self.ffprobe_path) {
            (Some(ffmpeg), Some(ffprobe)) => RealFfmpegRunner::new(ffmpeg, ffprobe),
            (ffmpeg, ffprobe) => {
                let found = RealFfmpegRunner::from_path();
                RealFfmpegRunner::new(
                    ffmpeg.clone().unwrap_or_else(|| found.ffmpeg_path().to_string()),
                    ffprobe.clone().unwrap_or_else(|| found.ffprobe_path().to_string()),
                )
            }
        }
    }
}
