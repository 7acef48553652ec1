//! Application layer - Generic services that use ports.

// Orchestrator: owns the batch, the worker pool and the summary
pub mod orchestrator;

pub mod report;

// Worker: one item at a time, synthesize -> admit -> allocate -> render
pub mod worker;
