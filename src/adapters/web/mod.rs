//! Remote content adapters.

pub mod reddit;

pub use reddit::SubredditSource;
