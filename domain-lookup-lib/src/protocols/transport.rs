//! Transport primitives consumed by the resolver.
//!
//! The resolver never opens sockets or builds HTTP clients itself; it talks
//! to these two traits. The default implementations use tokio's
//! `TcpStream` and `reqwest`. Tests plug in scripted implementations.

use crate::error::{LookupError, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Status and body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// "Open a line-oriented TCP session and collect all bytes until the peer
/// closes."
#[async_trait]
pub trait TcpLineClient: Send + Sync {
    async fn send(
        &self,
        host: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// "Issue an HTTP GET/POST with a timeout and get back status and body."
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;

    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// TCP client on top of tokio.
#[derive(Debug, Clone, Default)]
pub struct TokioTcpClient;

#[async_trait]
impl TcpLineClient for TokioTcpClient {
    async fn send(
        &self,
        host: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        // The budget covers connect, write and the read until EOF
        let exchange = async {
            let mut stream = TcpStream::connect((host, port))
                .await
                .map_err(|e| TransportError::from_io(host, &e))?;
            stream
                .write_all(payload)
                .await
                .map_err(|e| TransportError::from_io(host, &e))?;

            let mut buf = Vec::new();
            stream
                .read_to_end(&mut buf)
                .await
                .map_err(|e| TransportError::from_io(host, &e))?;
            Ok(buf)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(host, timeout)),
        }
    }
}

/// HTTP client on top of reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("domain-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = request.timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, timeout, &e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, timeout, &e))?;

        Ok(HttpResponse { status, body })
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(url, timeout)
    } else if err.is_connect() {
        TransportError::refused(url, err.to_string())
    } else if err.is_body() || err.is_decode() {
        TransportError::reset(url, err.to_string())
    } else {
        TransportError::malformed(url, err.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.execute(self.client.get(url), url, headers, timeout)
            .await
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.client.post(url).body(body.to_string());
        self.execute(request, url, headers, timeout).await
    }
}
