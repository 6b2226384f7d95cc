//! Integration tests running the full harness against in-process peers
//!
//! Raw TCP and UDP runs talk to the echo servers on `127.0.0.1:0`; HTTP runs
//! talk to a wiremock server.

use packet_loss_tester::{
    echo::{TcpEchoServer, UdpEchoServer},
    AttemptStatus, ConcurrencyMode, Config, PacketLossTester, ProtocolMode,
};
use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::io::AsyncReadExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

fn loopback_config(protocol_mode: ProtocolMode, port: u16, num_tests: u32) -> Config {
    Config {
        target_address: "127.0.0.1".to_string(),
        port: Some(port),
        num_tests,
        timeout_seconds: 1.0,
        protocol_mode,
        connection_type: "loopback".to_string(),
        enable_color: false,
        ..Default::default()
    }
}

/// A port with nothing listening on it
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn tcp_sync_run_against_echo_server() {
    let server = TcpEchoServer::bind("127.0.0.1:0").await.unwrap().spawn().unwrap();
    let config = loopback_config(ProtocolMode::Tcp, server.port(), 20);

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.success_count, 20);
    assert_eq!(report.stats.loss_percentage, 0.0);
    assert_eq!(report.reference_bytes, Some(config.payload_size));
    assert_eq!(report.stats.response_times_ms.len(), 20);
    assert!(report.stats.latency.is_some());
    assert_eq!(report.stats.target, format!("127.0.0.1:{}", server.port()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn udp_async_run_against_echo_server() {
    let server = UdpEchoServer::bind("127.0.0.1:0").await.unwrap().spawn().unwrap();
    let mut config = loopback_config(ProtocolMode::Udp, server.port(), 50);
    config.concurrency_mode = ConcurrencyMode::Async;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.success_count, 50);
    let numbers: HashSet<u32> = report.records.iter().map(|r| r.attempt_number).collect();
    assert_eq!(numbers, (1..=50).collect());

    let ordering = report.stats.ordering.expect("async runs carry ordering metrics");
    assert!(ordering.lis_length >= 1);
    assert_eq!(ordering.lis_disorder, 50 - ordering.lis_length);
}

#[tokio::test]
async fn udp_dropped_datagrams_count_as_timeouts() {
    let server = UdpEchoServer::bind("127.0.0.1:0")
        .await
        .unwrap()
        .drop_every(4)
        .spawn()
        .unwrap();
    let mut config = loopback_config(ProtocolMode::Udp, server.port(), 20);
    config.timeout_seconds = 0.2;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.success_count, 15);
    assert_eq!(report.stats.count(AttemptStatus::Timeout), 5);
    assert_eq!(report.stats.loss_percentage, 25.0);
    for n in [4, 8, 12, 16, 20] {
        assert_eq!(report.record(n).unwrap().status, AttemptStatus::Timeout);
    }
}

#[tokio::test]
async fn closed_port_is_reported_without_sending() {
    let port = closed_port().await;
    let mut config = loopback_config(ProtocolMode::Tcp, port, 3);
    config.dynamic_port_check = true;
    config.port_check_timeout_seconds = 0.2;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.count(AttemptStatus::PortClosed), 3);
    assert_eq!(report.stats.loss_percentage, 100.0);
    assert!(report.stats.latency.is_none());
}

#[tokio::test]
async fn refused_connection_without_probe() {
    let port = closed_port().await;
    let config = loopback_config(ProtocolMode::Tcp, port, 2);

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.count(AttemptStatus::ConnectionError), 2);
    assert!(report.records.iter().all(|r| r.elapsed_ms.is_none()));
}

#[tokio::test]
async fn http_refused_attempts_record_their_retries() {
    let port = closed_port().await;
    let mut config = loopback_config(ProtocolMode::Http, port, 2);
    config.max_retries = 2;
    config.backoff_factor = 0.01;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.count(AttemptStatus::ConnectionError), 2);
    assert!(report.records.iter().all(|r| r.retry_count == 2));
    assert_eq!(report.stats.total_retries, 4);
}

#[tokio::test]
async fn http_reset_after_request_is_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.set_linger(Some(Duration::ZERO)).unwrap();
        }
    });

    let mut config = loopback_config(ProtocolMode::Http, port, 1);
    config.max_retries = 1;
    config.backoff_factor = 0.01;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    let record = report.record(1).unwrap();
    assert_eq!(record.status, AttemptStatus::ConnectionError, "{}", record.detail);
    assert_eq!(record.retry_count, 1);
}

/// Serves `good` except on the listed request numbers (1-based)
struct FlakyDevice {
    served: AtomicUsize,
    corrupt_on: usize,
    busy_on: usize,
}

impl Respond for FlakyDevice {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.busy_on {
            ResponseTemplate::new(503)
        } else if n == self.corrupt_on {
            ResponseTemplate::new(200).set_body_string("device-Xk")
        } else {
            ResponseTemplate::new(200).set_body_string("device-ok")
        }
    }
}

#[tokio::test]
async fn http_run_detects_corruption_and_retries_busy_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(FlakyDevice {
            served: AtomicUsize::new(0),
            corrupt_on: 3,
            busy_on: 5,
        })
        .mount(&server)
        .await;

    let mut config = loopback_config(ProtocolMode::Http, server.address().port(), 6);
    config.http_path = "/status".to_string();
    config.backoff_factor = 0.01;

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    let corrupted = report.record(3).unwrap();
    assert_eq!(corrupted.status, AttemptStatus::CharacterMismatch);
    assert!(corrupted.detail.contains("Pos 7: o != X"));

    // Request 5 got a 503 and was retried inside attempt 5
    let retried = report.record(5).unwrap();
    assert_eq!(retried.status, AttemptStatus::Success);
    assert_eq!(retried.retry_count, 1);

    assert_eq!(report.stats.success_count, 5);
    assert_eq!(report.stats.total_retries, 1);
}

#[tokio::test]
async fn http_status_other_than_200_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = loopback_config(ProtocolMode::Http, server.address().port(), 2);

    let report = PacketLossTester::from_config(&config)
        .unwrap()
        .run(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(report.stats.count(AttemptStatus::UnexpectedResponse), 2);
    assert_eq!(report.reference_bytes, None);
}
