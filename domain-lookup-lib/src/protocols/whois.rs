//! Raw WHOIS transport (RFC 3912).
//!
//! One TCP connection per query to port 43: write the domain followed by
//! CRLF, read until the server closes the connection. WHOIS has no length
//! framing, so end-of-stream is the success signal.

use crate::error::TransportError;
use crate::protocols::transport::TcpLineClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Well-known WHOIS port.
pub const WHOIS_PORT: u16 = 43;

/// Responses shorter than this (after trimming) are refusal banners, not data.
pub const MIN_RESPONSE_LEN: usize = 50;

/// WHOIS client that runs queries over a [`TcpLineClient`].
#[derive(Clone)]
pub struct WhoisClient {
    tcp: Arc<dyn TcpLineClient>,
    /// Hard budget for one exchange, connect included
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(tcp: Arc<dyn TcpLineClient>, timeout: Duration) -> Self {
        Self { tcp, timeout }
    }

    /// Query `host` for `domain` and return the response text.
    ///
    /// A rate-limit banner gets one retry after a one second pause. Anything
    /// shorter than [`MIN_RESPONSE_LEN`] is reported as a malformed response
    /// even though the TCP exchange itself worked.
    pub async fn query(&self, domain: &str, host: &str) -> Result<String, TransportError> {
        let start = Instant::now();
        let mut text = self.exchange(domain, host).await?;

        if is_rate_limited(&text) {
            tracing::debug!(domain, host, "WHOIS rate limited, retrying once");
            tokio::time::sleep(Duration::from_millis(1000)).await;
            text = self.exchange(domain, host).await?;
            if is_rate_limited(&text) {
                return Err(TransportError::malformed(host, "rate limited"));
            }
        }

        let trimmed_len = text.trim().len();
        tracing::debug!(
            domain,
            host,
            bytes = trimmed_len,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "WHOIS response received"
        );

        if trimmed_len < MIN_RESPONSE_LEN {
            return Err(TransportError::malformed(
                host,
                format!("response too short ({} bytes)", trimmed_len),
            ));
        }

        Ok(text)
    }

    async fn exchange(&self, domain: &str, host: &str) -> Result<String, TransportError> {
        let payload = format!("{}\r\n", domain);
        let bytes = self
            .tcp
            .send(host, WHOIS_PORT, payload.as_bytes(), self.timeout)
            .await?;

        // Many ccTLD registries answer in Latin-1; keep what decodes
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Check if the WHOIS output indicates rate limiting.
fn is_rate_limited(output: &str) -> bool {
    // Long responses that mention limits in their legal footer are data
    if output.trim().len() > 600 {
        return false;
    }

    let output_lower = output.to_lowercase();
    let rate_limit_patterns = [
        "rate limit exceeded",
        "too many requests",
        "try again later",
        "quota exceeded",
        "limit exceeded",
        "query rate",
        "rate-limited",
    ];

    rate_limit_patterns
        .iter()
        .any(|pattern| output_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with scripted payloads in order and records what was sent.
    struct ScriptedTcp {
        replies: Mutex<Vec<Result<Vec<u8>, TransportError>>>,
        sent: Mutex<Vec<(String, u16, Vec<u8>)>>,
    }

    impl ScriptedTcp {
        fn new(replies: Vec<Result<&str, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(|s| s.as_bytes().to_vec()))
                        .collect(),
                ),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TcpLineClient for ScriptedTcp {
        async fn send(
            &self,
            host: &str,
            port: u16,
            payload: &[u8],
            _timeout: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((host.to_string(), port, payload.to_vec()));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(TransportError::refused(host, "no script")))
        }
    }

    const FULL: &str = "Domain Name: EXAMPLE.COM\r\nRegistrar: Example Registrar, Inc.\r\nCreation Date: 1995-08-14T04:00:00Z\r\n";

    #[tokio::test]
    async fn test_query_sends_domain_with_crlf_to_port_43() {
        let tcp = ScriptedTcp::new(vec![Ok(FULL)]);
        let client = WhoisClient::new(tcp.clone(), Duration::from_secs(15));

        let text = client.query("example.com", "whois.verisign-grs.com").await.unwrap();
        assert!(text.contains("Example Registrar"));

        let sent = tcp.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "whois.verisign-grs.com");
        assert_eq!(sent[0].1, WHOIS_PORT);
        assert_eq!(sent[0].2, b"example.com\r\n");
    }

    #[tokio::test]
    async fn test_short_response_is_malformed() {
        let tcp = ScriptedTcp::new(vec![Ok("Access denied.\n")]);
        let client = WhoisClient::new(tcp, Duration::from_secs(15));

        let err = client.query("example.com", "whois.example").await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_retries_once() {
        let tcp = ScriptedTcp::new(vec![
            Ok("Query rate exceeded. Too many requests, try again later."),
            Ok(FULL),
        ]);
        let client = WhoisClient::new(tcp.clone(), Duration::from_secs(15));

        let text = client.query("example.com", "whois.example").await.unwrap();
        assert!(text.contains("Creation Date"));
        assert_eq!(tcp.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_is_passed_through() {
        let tcp = ScriptedTcp::new(vec![Err(TransportError::timeout(
            "whois.example",
            Duration::from_secs(15),
        ))]);
        let client = WhoisClient::new(tcp, Duration::from_secs(15));

        let err = client.query("example.com", "whois.example").await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited("Rate limit exceeded. Try again later."));
        assert!(is_rate_limited("Too many requests from your IP."));
        assert!(!is_rate_limited("Normal whois response"));
        assert!(!is_rate_limited(&format!("{}\nTry again later.", FULL.repeat(10))));
    }
}
