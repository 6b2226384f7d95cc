//! UDP transport carrying a `SEQ:<n>|` header that the peer must echo

use super::{
    payload::{decode_sequenced, encode_sequenced},
    with_deadline, ResponseCode, Transport, TransportResponse, TransportResult,
};
use crate::{
    error::{AppError, Result},
    types::ProtocolMode,
};
use async_trait::async_trait;
use std::{net::SocketAddr, time::Duration};
use tokio::net::{lookup_host, UdpSocket};

const MAX_DATAGRAM: usize = 65_536;

/// One ephemeral socket per attempt, so late replies cannot cross attempts
pub struct UdpTransport {
    host: String,
    port: u16,
    payload: Vec<u8>,
}

impl UdpTransport {
    pub fn new(host: &str, port: u16, payload: Vec<u8>) -> Self {
        Self {
            host: host.to_string(),
            port,
            payload,
        }
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| AppError::network(format!("No address found for {}", self.host)))
    }

    async fn exchange(&self, sequence: u32) -> Result<Vec<u8>> {
        let peer = self.resolve().await?;
        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        socket.send(&encode_sequenced(sequence, &self.payload)).await?;

        let mut buffer = vec![0u8; MAX_DATAGRAM];
        let n = socket.recv(&mut buffer).await?;
        buffer.truncate(n);

        Ok(buffer)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_request(&self, attempt_number: u32, timeout: Duration) -> TransportResult {
        let datagram = with_deadline(timeout, self.exchange(attempt_number)).await?;
        let (echoed, body) = decode_sequenced(&datagram);

        Ok(TransportResponse::new(
            ResponseCode::Datagram {
                expected: attempt_number,
                echoed,
            },
            body.to_vec(),
        ))
    }

    fn protocol(&self) -> ProtocolMode {
        ProtocolMode::Udp
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn responder<F>(reply: F) -> u16
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            while let Ok((n, from)) = socket.recv_from(&mut buf).await {
                let _ = socket.send_to(&reply(&buf[..n]), from).await;
            }
        });

        port
    }

    #[tokio::test]
    async fn test_echo_returns_payload_and_sequence() {
        let port = responder(|d| d.to_vec()).await;
        let transport = UdpTransport::new("127.0.0.1", port, b"hello".to_vec());

        let response = transport.send_request(42, Duration::from_secs(2)).await.unwrap();

        assert_eq!(response.code, ResponseCode::Datagram { expected: 42, echoed: Some(42) });
        assert!(response.code.sequence_matches());
        assert_eq!(response.body, b"hello");
    }

    #[tokio::test]
    async fn test_wrong_sequence_is_reported() {
        let port = responder(|_| b"SEQ:7|hello".to_vec()).await;
        let transport = UdpTransport::new("127.0.0.1", port, b"hello".to_vec());

        let response = transport.send_request(3, Duration::from_secs(2)).await.unwrap();

        assert_eq!(response.code, ResponseCode::Datagram { expected: 3, echoed: Some(7) });
        assert!(!response.code.sequence_matches());
    }

    #[tokio::test]
    async fn test_missing_header_is_reported() {
        let port = responder(|_| b"pong".to_vec()).await;
        let transport = UdpTransport::new("127.0.0.1", port, b"hello".to_vec());

        let response = transport.send_request(3, Duration::from_secs(2)).await.unwrap();

        assert_eq!(response.code, ResponseCode::Datagram { expected: 3, echoed: None });
        assert_eq!(response.body, b"pong");
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        let transport = UdpTransport::new("127.0.0.1", port, b"hello".to_vec());
        let result = transport.send_request(1, Duration::from_millis(100)).await;

        assert!(matches!(result.map_err(|e| e.error), Err(AppError::Timeout(_))));
        drop(socket);
    }
}
