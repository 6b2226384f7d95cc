//! HTTP GET transport with transport-level retries

use super::{ResponseCode, RetryPolicy, Transport, TransportError, TransportResponse, TransportResult};
use crate::{
    error::{AppError, Result},
    types::ProtocolMode,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::{net::Ipv6Addr, time::Duration};

/// HTTP transport over one pooled keep-alive client
pub struct HttpTransport {
    client: Client,
    url: Url,
    target: String,
    policy: RetryPolicy,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16, path: &str, policy: RetryPolicy) -> Result<Self> {
        let url = Self::build_url(host, port, path)?;
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .pool_max_idle_per_host(16)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            target: format!("{}:{}", host, port),
            policy,
        })
    }

    /// Base URL for the target, bracketing IPv6 literals
    pub fn build_url(host: &str, port: u16, path: &str) -> Result<Url> {
        let host = if host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        Ok(Url::parse(&format!("http://{}:{}", host, port))?.join(path)?)
    }

    async fn get_once(&self, timeout: Duration) -> Result<(u16, Vec<u8>)> {
        let response = self
            .client
            .get(self.url.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_request(&self, _attempt_number: u32, timeout: Duration) -> TransportResult {
        let mut retries = 0;

        loop {
            match self.get_once(timeout).await {
                Ok((status, _)) if self.policy.is_retryable_status(status) && self.policy.can_retry(retries) => {}
                Ok((status, body)) => {
                    return Ok(TransportResponse::new(ResponseCode::Http(status), body).with_retries(retries));
                }
                Err(error) if self.policy.is_retryable_error(&error) && self.policy.can_retry(retries) => {}
                Err(error) => return Err(TransportError::from(error).with_retries(retries)),
            }

            retries += 1;
            tokio::time::sleep(self.policy.backoff(retries)).await;
        }
    }

    fn protocol(&self) -> ProtocolMode {
        ProtocolMode::Http
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}
