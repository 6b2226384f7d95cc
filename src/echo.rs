//! TCP and UDP echo peers
//!
//! Far-end servers for the raw TCP and UDP modes: every received buffer is
//! sent back unchanged. Bind to port 0 to get an ephemeral port.

use crate::{
    error::{ErrorContext, Result},
    logging::Logger,
};
use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
    task::JoinHandle,
};

const BUFFER_SIZE: usize = 65_536;

/// Pause after a failed accept or receive before trying again
const RETRY_DELAY: Duration = Duration::from_millis(50);

fn echo_logger() -> Logger {
    Logger::new("ECHO".to_string())
}

/// Running echo server; the task is aborted on drop
pub struct EchoHandle {
    local_addr: SocketAddr,
    echoed: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl EchoHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Buffers (TCP reads or UDP datagrams) echoed so far
    pub fn echoed(&self) -> u64 {
        self.echoed.load(Ordering::Relaxed)
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for EchoHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// TCP echo server; each connection is served on its own task until EOF
pub struct TcpEchoServer {
    listener: TcpListener,
    echoed: Arc<AtomicU64>,
    logger: Logger,
}

impl TcpEchoServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind TCP echo server on {}", addr))?;
        Ok(Self {
            listener,
            echoed: Arc::new(AtomicU64::new(0)),
            logger: echo_logger(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever; a failed accept is logged and retried
    pub async fn serve(self) {
        let listener = Arc::new(self.listener);
        let accept = move || {
            let listener = Arc::clone(&listener);
            async move { listener.accept().await.map(|(stream, _)| stream) }
        };
        serve_connections(accept, self.echoed, &self.logger).await
    }

    pub fn spawn(self) -> Result<EchoHandle> {
        let local_addr = self.local_addr()?;
        let echoed = Arc::clone(&self.echoed);
        Ok(EchoHandle {
            local_addr,
            echoed,
            task: tokio::spawn(self.serve()),
        })
    }
}

async fn serve_connections<A, F>(mut accept: A, echoed: Arc<AtomicU64>, logger: &Logger)
where
    A: FnMut() -> F,
    F: Future<Output = io::Result<TcpStream>>,
{
    loop {
        let stream = match accept().await {
            Ok(stream) => stream,
            Err(error) => {
                logger
                    .warn("Echo server failed to accept a connection")
                    .field("error", error.to_string())
                    .log()
                    .await;
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        let echoed = Arc::clone(&echoed);
        tokio::spawn(async move {
            // A peer that resets mid-stream only ends its own connection
            let _ = echo_stream(stream, echoed).await;
        });
    }
}

async fn echo_stream(mut stream: TcpStream, echoed: Arc<AtomicU64>) -> Result<()> {
    let _ = stream.set_nodelay(true);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let read = stream.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        echoed.fetch_add(1, Ordering::Relaxed);
        stream.write_all(&buffer[..read]).await?;
    }
}

/// UDP echo server
///
/// `drop_every(n)` silently discards every n-th datagram, which gives test
/// runs a deterministic loss rate.
pub struct UdpEchoServer {
    socket: UdpSocket,
    drop_every: Option<u64>,
    echoed: Arc<AtomicU64>,
    logger: Logger,
}

impl UdpEchoServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind UDP echo server on {}", addr))?;
        Ok(Self {
            socket,
            drop_every: None,
            echoed: Arc::new(AtomicU64::new(0)),
            logger: echo_logger(),
        })
    }

    pub fn drop_every(mut self, n: u64) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Echo datagrams forever; socket errors are logged and skipped
    pub async fn serve(self) {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut received: u64 = 0;

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buffer).await {
                Ok(datagram) => datagram,
                Err(error) => {
                    self.logger
                        .warn("Echo server failed to receive a datagram")
                        .field("error", error.to_string())
                        .log()
                        .await;
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };
            received += 1;

            if matches!(self.drop_every, Some(n) if received % n == 0) {
                continue;
            }

            self.echoed.fetch_add(1, Ordering::Relaxed);
            if let Err(error) = self.socket.send_to(&buffer[..len], peer).await {
                self.logger
                    .warn("Echo server failed to send a datagram")
                    .field("peer", peer.to_string())
                    .field("error", error.to_string())
                    .log()
                    .await;
            }
        }
    }

    pub fn spawn(self) -> Result<EchoHandle> {
        let local_addr = self.local_addr()?;
        let echoed = Arc::clone(&self.echoed);
        Ok(EchoHandle {
            local_addr,
            echoed,
            task: tokio::spawn(self.serve()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_tcp_echo() {
        let server = TcpEchoServer::bind("127.0.0.1:0").await.unwrap().spawn().unwrap();

        let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
        stream.write_all(b"hello").await.unwrap();
        let mut reply = [0u8; 5];
        stream.read_exact(&mut reply).await.unwrap();

        assert_eq!(&reply, b"hello");
        assert_eq!(server.echoed(), 1);
    }

    #[tokio::test]
    async fn test_tcp_echo_serves_many_connections() {
        let server = TcpEchoServer::bind("127.0.0.1:0").await.unwrap().spawn().unwrap();

        for i in 0..5u8 {
            let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
            stream.write_all(&[i; 3]).await.unwrap();
            let mut reply = [0u8; 3];
            stream.read_exact(&mut reply).await.unwrap();
            assert_eq!(reply, [i; 3]);
        }
    }

    #[tokio::test]
    async fn test_tcp_echo_keeps_accepting_after_failed_accepts() {
        let listener = Arc::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));

        let accept = {
            let attempts = Arc::clone(&attempts);
            move || {
                let listener = Arc::clone(&listener);
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(io::Error::other("Too many open files"))
                    } else {
                        listener.accept().await.map(|(stream, _)| stream)
                    }
                }
            }
        };
        let echoed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&echoed);
        let task = tokio::spawn(async move {
            let logger = echo_logger();
            serve_connections(accept, counter, &logger).await
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"still here").await.unwrap();
        let mut reply = [0u8; 10];
        stream.read_exact(&mut reply).await.unwrap();

        assert_eq!(&reply, b"still here");
        assert!(attempts.load(Ordering::SeqCst) >= 3);
        assert_eq!(echoed.load(Ordering::Relaxed), 1);
        task.abort();
    }

    #[tokio::test]
    async fn test_udp_echo() {
        let server = UdpEchoServer::bind("127.0.0.1:0").await.unwrap().spawn().unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(server.local_addr()).await.unwrap();

        client.send(b"SEQ:1|ping").await.unwrap();
        let mut buffer = [0u8; 64];
        let len = client.recv(&mut buffer).await.unwrap();

        assert_eq!(&buffer[..len], b"SEQ:1|ping");
    }

    #[tokio::test]
    async fn test_udp_drop_every() {
        let server = UdpEchoServer::bind("127.0.0.1:0")
            .await
            .unwrap()
            .drop_every(2)
            .spawn()
            .unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(server.local_addr()).await.unwrap();
        let mut buffer = [0u8; 64];

        client.send(b"one").await.unwrap();
        let len = client.recv(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], b"one");

        client.send(b"two").await.unwrap();
        let dropped = tokio::time::timeout(Duration::from_millis(200), client.recv(&mut buffer)).await;
        assert!(dropped.is_err());
        assert_eq!(server.echoed(), 1);
    }
}
