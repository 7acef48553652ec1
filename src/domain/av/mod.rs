//! Audio/Video domain modules.

pub mod cmd;
pub mod compositor;
pub mod probe;
