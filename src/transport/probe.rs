//! Pre-flight TCP port reachability probe

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Reachability check run before an attempt when dynamic port checking is on
#[async_trait]
pub trait PortProbe: Send + Sync {
    async fn is_port_open(&self, host: &str, port: u16, timeout: Duration) -> bool;
}

/// Probe that completes a TCP handshake and drops the connection
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpPortProbe;

#[async_trait]
impl PortProbe for TcpPortProbe {
    async fn is_port_open(&self, host: &str, port: u16, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
            Ok(Ok(_))
        )
    }
}
