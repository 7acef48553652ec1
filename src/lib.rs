//! Reelcast - narrated short clips from text posts and shared footage
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (timeline allocation, admission, jobs, av)
//! - ports/: Trait definitions (content source, synthesizer, job queue)
//! - adapters/: Concrete implementations (subreddit listing, text files, TTS command, memory queue)
//! - application/: Worker pool, orchestration and run reports
//! - config: Environment / command line configuration
//!
//! # Features
//! - `libav`: probe media through `ffmpeg-next` instead of the `ffprobe` binary

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use config::RunConfig;
pub use domain::av;
