//! Data models and structures for the packet loss tester

pub mod attempt;
pub mod config;

// Re-export main model types
pub use attempt::{AttemptRecord, AttemptStatus};
pub use config::Config;
