//! Packet Loss Tester
//!
//! A reliability harness that drives request/response attempts against a
//! device over HTTP, raw TCP or UDP, classifies every attempt, measures
//! round-trip latency and summarises loss, latency and completion ordering.

pub mod app;
pub mod config;
pub mod echo;
pub mod error;
pub mod harness;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use harness::{PacketLossTester, RunReport};
pub use models::{AttemptRecord, AttemptStatus, Config};
pub use output::{ColoredFormatter, JsonReportWriter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use stats::{LatencyStats, OrderingMetrics, SummaryStats};
pub use transport::{PortProbe, RetryPolicy, Transport, TransportError, TransportFactory, TransportResponse, TransportResult};
pub use types::{ConcurrencyMode, ProtocolMode};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const BUILD_TIME: &str = env!("PLT_BUILD_TIME");
pub const GIT_COMMIT: &str = env!("PLT_GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_TARGET_ADDRESS: &str = "192.168.1.1";
    pub const DEFAULT_NUM_TESTS: u32 = 200;
    pub const MAX_NUM_TESTS: u32 = 100_000;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.3;
    pub const DEFAULT_PAYLOAD_SIZE: usize = 64;
    pub const MAX_UDP_PAYLOAD: usize = 65_000;
    pub const DEFAULT_CONNECTION_TYPE: &str = "unspecified";
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Differing byte positions listed in a mismatch detail
    pub const MAX_REPORTED_MISMATCHES: usize = 5;
}
