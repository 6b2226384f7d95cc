//! Raw TCP transport: connect, write the payload, read the reply

use super::{with_deadline, ResponseCode, Transport, TransportResponse, TransportResult};
use crate::{error::Result, types::ProtocolMode};
use async_trait::async_trait;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Once the first bytes are in, wait at most this long for the rest
const DRAIN_WINDOW: Duration = Duration::from_millis(50);

const MIN_READ_BUFFER: usize = 4096;

/// One fresh connection per attempt
pub struct TcpTransport {
    host: String,
    port: u16,
    payload: Vec<u8>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16, payload: Vec<u8>) -> Self {
        Self {
            host: host.to_string(),
            port,
            payload,
        }
    }

    async fn exchange(&self) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        stream.write_all(&self.payload).await?;

        let mut buffer = vec![0u8; self.payload.len().max(MIN_READ_BUFFER)];
        let mut reply = Vec::new();

        // First read waits for the device; the outer deadline bounds it
        let n = stream.read(&mut buffer).await?;
        reply.extend_from_slice(&buffer[..n]);

        // Echo peers may split the reply across segments
        while n > 0 && reply.len() < self.payload.len() {
            match tokio::time::timeout(DRAIN_WINDOW, stream.read(&mut buffer)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(more)) => reply.extend_from_slice(&buffer[..more]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        Ok(reply)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_request(&self, _attempt_number: u32, timeout: Duration) -> TransportResult {
        let body = with_deadline(timeout, self.exchange()).await?;
        Ok(TransportResponse::new(ResponseCode::Stream, body))
    }

    fn protocol(&self) -> ProtocolMode {
        ProtocolMode::Tcp
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reply_is_collected_across_segments() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 8];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(&buf[..3]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            socket.write_all(&buf[3..]).await.unwrap();
        });

        let transport = TcpTransport::new("127.0.0.1", port, b"ABCDEFGH".to_vec());
        let response = transport.send_request(1, Duration::from_secs(2)).await.unwrap();

        assert_eq!(response.code, ResponseCode::Stream);
        assert_eq!(response.body, b"ABCDEFGH");
    }

    #[tokio::test]
    async fn test_peer_closing_without_reply_gives_empty_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            let _ = socket.read_exact(&mut buf).await;
            socket.shutdown().await.unwrap();
        });

        let transport = TcpTransport::new("127.0.0.1", port, b"ping".to_vec());
        let response = transport.send_request(1, Duration::from_secs(2)).await.unwrap();

        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let transport = TcpTransport::new("127.0.0.1", port, b"ping".to_vec());
        let result = transport.send_request(1, Duration::from_millis(100)).await;

        assert!(matches!(result.map_err(|e| e.error), Err(AppError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = TcpTransport::new("127.0.0.1", port, b"ping".to_vec());
        let result = transport.send_request(1, Duration::from_secs(1)).await;

        assert!(matches!(result.map_err(|e| e.error), Err(AppError::Connection(_))));
    }
}
