//! Request/response transports used by the harness
//!
//! A transport performs exactly one logical request per call. Retries, when
//! the protocol has them, happen inside the transport and are reported back
//! through `retry_count` on both [`TransportResponse`] and [`TransportError`].

pub mod http;
pub mod payload;
pub mod probe;
pub mod retry;
pub mod tcp;
pub mod udp;

use crate::{
    error::{AppError, Result},
    models::Config,
    types::ProtocolMode,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

pub use http::HttpTransport;
pub use probe::{PortProbe, TcpPortProbe};
pub use retry::RetryPolicy;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Protocol-level outcome code of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    /// HTTP status code
    Http(u16),
    /// Raw TCP reply; the stream has no status of its own
    Stream,
    /// UDP echo with the sequence number sent and the one read back
    Datagram { expected: u32, echoed: Option<u32> },
}

impl ResponseCode {
    /// Whether the protocol considers this a successful exchange
    pub fn is_success(&self) -> bool {
        match self {
            ResponseCode::Http(status) => *status == 200,
            ResponseCode::Stream | ResponseCode::Datagram { .. } => true,
        }
    }

    /// Whether the echoed sequence number matches the one sent
    pub fn sequence_matches(&self) -> bool {
        match self {
            ResponseCode::Datagram { expected, echoed } => *echoed == Some(*expected),
            _ => true,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Http(status) => write!(f, "HTTP {}", status),
            ResponseCode::Stream => write!(f, "TCP"),
            ResponseCode::Datagram { echoed: Some(seq), .. } => write!(f, "SEQ {}", seq),
            ResponseCode::Datagram { echoed: None, .. } => write!(f, "SEQ missing"),
        }
    }
}

/// What a transport hands back for one request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub code: ResponseCode,
    /// Response payload; for UDP the bytes after the sequence header
    pub body: Vec<u8>,
    /// Retries consumed before this response
    pub retry_count: u32,
}

impl TransportResponse {
    pub fn new(code: ResponseCode, body: Vec<u8>) -> Self {
        Self {
            code,
            body,
            retry_count: 0,
        }
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

/// A request that failed, with the retries spent before giving up
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    pub error: AppError,
    pub retry_count: u32,
}

impl TransportError {
    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }
}

impl From<AppError> for TransportError {
    fn from(error: AppError) -> Self {
        Self { error, retry_count: 0 }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retry_count {
            0 => write!(f, "{}", self.error),
            n => write!(f, "{} (after {} retries)", self.error, n),
        }
    }
}

pub type TransportResult = std::result::Result<TransportResponse, TransportError>;

/// One request/response exchange against the target
///
/// Failures carry a typed [`AppError`]: `Timeout` when nothing arrived in
/// time, `Connection` when the peer refused or reset, anything else for the
/// remaining cases.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request tagged with `attempt_number`, bounded by `timeout`
    async fn send_request(&self, attempt_number: u32, timeout: Duration) -> TransportResult;

    /// Protocol spoken by this transport
    fn protocol(&self) -> ProtocolMode;

    /// `host:port` of the target
    fn target(&self) -> String;
}

/// Builds the transport matching the configured protocol
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &Config) -> Result<Arc<dyn Transport>> {
        let host = config.target_address.trim();
        let port = config.effective_port();

        if host.is_empty() {
            return Err(AppError::config("Cannot build a transport without a target address"));
        }

        let transport: Arc<dyn Transport> = match config.protocol_mode {
            ProtocolMode::Http => Arc::new(HttpTransport::new(
                host,
                port,
                &config.http_path,
                RetryPolicy::from(config),
            )?),
            ProtocolMode::Tcp => Arc::new(TcpTransport::new(host, port, payload::test_payload(config.payload_size))),
            ProtocolMode::Udp => Arc::new(UdpTransport::new(host, port, payload::test_payload(config.payload_size))),
        };

        Ok(transport)
    }
}

/// Bound `future` by `timeout`, mapping expiry to a timeout error
pub(crate) async fn with_deadline<T, F>(timeout: Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(AppError::timeout(format!(
            "no reply within {} ms",
            timeout.as_millis()
        ))),
    }
}
