//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Wire protocol used for each attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolMode {
    /// HTTP GET against the device web server; success is status 200
    Http,
    /// Raw TCP exchange; success is any non-empty reply
    Tcp,
    /// UDP datagram carrying a sequence header that must be echoed back
    Udp,
}

impl ProtocolMode {
    /// Get a human-readable name for this protocol
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolMode::Http => "HTTP",
            ProtocolMode::Tcp => "TCP",
            ProtocolMode::Udp => "UDP",
        }
    }

    /// Default port for this protocol when none is configured
    pub fn default_port(&self) -> u16 {
        match self {
            ProtocolMode::Http => 80,
            ProtocolMode::Tcp | ProtocolMode::Udp => 5000,
        }
    }

    /// Whether the transport runs its own retry loop
    pub fn supports_retries(&self) -> bool {
        matches!(self, ProtocolMode::Http)
    }
}

impl fmt::Display for ProtocolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(ProtocolMode::Http),
            "tcp" | "raw-tcp" | "tcp-only" => Ok(ProtocolMode::Tcp),
            "udp" => Ok(ProtocolMode::Udp),
            other => Err(AppError::parse(format!(
                "Invalid protocol mode '{}': expected http, tcp or udp",
                other
            ))),
        }
    }
}

/// How attempts are scheduled within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// One attempt at a time, in dispatch order
    Sync,
    /// Every attempt dispatched up front, collected in completion order
    Async,
}

impl ConcurrencyMode {
    pub fn name(&self) -> &'static str {
        match self {
            ConcurrencyMode::Sync => "SYNC",
            ConcurrencyMode::Async => "ASYNC",
        }
    }
}

impl fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConcurrencyMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ConcurrencyMode::Sync),
            "async" | "asynchronous" => Ok(ConcurrencyMode::Async),
            other => Err(AppError::parse(format!(
                "Invalid concurrency mode '{}': expected sync or async",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_mode_parsing() {
        assert_eq!("HTTP".parse::<ProtocolMode>().unwrap(), ProtocolMode::Http);
        assert_eq!("tcp-only".parse::<ProtocolMode>().unwrap(), ProtocolMode::Tcp);
        assert_eq!(" udp ".parse::<ProtocolMode>().unwrap(), ProtocolMode::Udp);
        assert!("sctp".parse::<ProtocolMode>().is_err());
    }

    #[test]
    fn test_concurrency_mode_parsing() {
        assert_eq!("async".parse::<ConcurrencyMode>().unwrap(), ConcurrencyMode::Async);
        assert_eq!("Synchronous".parse::<ConcurrencyMode>().unwrap(), ConcurrencyMode::Sync);
        assert!("parallel".parse::<ConcurrencyMode>().is_err());
    }

    #[test]
    fn test_only_http_retries() {
        assert!(ProtocolMode::Http.supports_retries());
        assert!(!ProtocolMode::Tcp.supports_retries());
        assert!(!ProtocolMode::Udp.supports_retries());
    }
}
