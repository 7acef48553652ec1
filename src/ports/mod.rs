//! Ports - Traits for the collaborators outside the core.

pub mod queue;
pub mod source;
pub mod synthesizer;
