//! Domain layer - Pure business logic.

pub mod admission;
pub mod av;
pub mod jobs;
pub mod timeline;
