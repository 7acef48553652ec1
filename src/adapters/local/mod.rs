//! Local adapters: filesystem source, in-memory queue, command-line TTS.

pub mod fs;
pub mod queue;
pub mod tts;

pub use fs::TextFileSource;
pub use queue::MemoryQueue;
pub use tts::CommandSynthesizer;
