//! Reelcast Binary - Batch run from a content source to narrated clips
//!
//! It wires up:
//! - Content source (subreddit listing or local text file)
//! - Command-line TTS synthesizer and ffmpeg compositor
//! - Worker pool over an in-memory queue, with Ctrl-C cancellation

use anyhow::Context;
use reelcast::adapters::{local::CommandSynthesizer, source_from_identifier};
use reelcast::application::{orchestrator, orchestrator::OrchestratorService, report};
use reelcast::config::RunConfig;
use reelcast::domain::av::cmd::RealFfmpegRunner;
use reelcast::domain::av::compositor::Compositor;
use tracing::{info, warn};

#[cfg(not(feature = "libav"))]
fn media_probe(runner: &RealFfmpegRunner) -> reelcast::av::probe::FfprobeProbe<RealFfmpegRunner> {
    reelcast::av::probe::FfprobeProbe::new(runner.clone())
}

#[cfg(feature = "libav")]
fn media_probe(_runner: &RealFfmpegRunner) -> reelcast::av::probe::LibavProbe {
    reelcast::av::probe::LibavProbe
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RunConfig::from_env();
    config.validate().context("invalid configuration")?;

    tracing_subscriber::fmt::init();

    // 1. Adapters
    let runner = config.ffmpeg_runner();
    let footage = orchestrator::load_footage(&config.footage_path, &media_probe(&runner))
        .await
        .context("cannot use footage")?;
    info!(
        path = %footage.path.display(),
        duration = footage.duration,
        has_audio = footage.has_audio,
        "footage loaded"
    );

    let scratch = tempfile::Builder::new()
        .prefix("reelcast-")
        .tempdir()
        .context("cannot create scratch directory")?;
    let synthesizer = CommandSynthesizer::new(
        &config.tts_program,
        config.tts_args(),
        &config.tts_extension,
        scratch.path(),
        media_probe(&runner),
    );
    let compositor = Compositor::new(runner, config.compositor_settings());
    let source = source_from_identifier(&config.source).context("cannot build content source")?;

    // 2. Application Service
    let orchestrator =
        OrchestratorService::new(synthesizer, compositor, config.admission(), config.sink())
            .with_start_offset(config.start_offset);

    // 3. Ctrl-C stops pending items between stages
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling remaining items");
            cancel.cancel();
        }
    });

    // 4. Run
    let summary = orchestrator
        .run_from_source(source.as_ref(), config.item_limit, footage, config.workers)
        .await
        .context("run aborted")?;

    print!("{}", report::render_text(&summary));
    if let Some(path) = &config.summary_path {
        report::write_json(&summary, path)
            .await
            .with_context(|| format!("cannot write summary to {}", path.display()))?;
    }

    Ok(())
}
