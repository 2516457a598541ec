//! RDAP (Registration Data Access Protocol) transport.
//!
//! Builds a prioritized list of candidate endpoints for a domain and returns
//! the first non-empty JSON document any of them serves. Shape validation is
//! left to [`crate::parsers::rdap_json`].

use crate::error::TransportError;
use crate::protocols::registry::{rdap_base_for, BootstrapCache};
use crate::protocols::tld::registry_suffix;
use crate::protocols::transport::HttpClient;
use std::sync::Arc;
use std::time::Duration;

/// A successful RDAP answer.
#[derive(Debug, Clone)]
pub struct RdapDocument {
    /// URL that answered
    pub url: String,
    /// Host part of `url`, used as `source_host`
    pub host: String,
    pub json: serde_json::Value,
    /// Body as received
    pub body: String,
}

/// RDAP client for registration lookups.
#[derive(Clone)]
pub struct RdapClient {
    http: Arc<dyn HttpClient>,
    /// Budget for each request
    timeout: Duration,
    /// Whether to use IANA bootstrap for TLDs without a built-in endpoint
    use_bootstrap: bool,
    bootstrap: Arc<BootstrapCache>,
    /// Public base URLs tried after the registry-specific ones
    mirrors: Vec<String>,
}

impl RdapClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        bootstrap: Arc<BootstrapCache>,
        timeout: Duration,
        use_bootstrap: bool,
        mirrors: Vec<String>,
    ) -> Self {
        Self {
            http,
            timeout,
            use_bootstrap,
            bootstrap,
            mirrors,
        }
    }

    /// Query RDAP for `domain`, stopping at the first candidate that answers
    /// with HTTP success and a non-empty JSON body.
    ///
    /// Candidates in priority order: built-in endpoint, bootstrap endpoint,
    /// public mirrors. The bootstrap registry is only consulted once the
    /// built-in endpoint is missing or has failed, and a URL is never asked
    /// twice. Every candidate failing is an ordinary outcome; the last
    /// failure is returned so the caller can log it.
    pub async fn query(&self, domain: &str) -> Result<RdapDocument, TransportError> {
        let suffix = registry_suffix(domain);
        let mut tried: Vec<String> = Vec::new();
        let mut last_error = TransportError::malformed("rdap", "no RDAP endpoint for this domain");

        if let Some(base) = suffix.as_deref().and_then(rdap_base_for) {
            if let Some(doc) = self.attempt(domain, base, &mut tried, &mut last_error).await {
                return Ok(doc);
            }
        }

        if let (true, Some(suffix)) = (self.use_bootstrap, &suffix) {
            let tld = suffix.rsplit('.').next().unwrap_or(suffix);
            if let Some(base) = self
                .bootstrap
                .lookup(tld, self.http.as_ref(), self.timeout)
                .await
            {
                if let Some(doc) = self.attempt(domain, &base, &mut tried, &mut last_error).await {
                    return Ok(doc);
                }
            }
        }

        for base in &self.mirrors {
            if let Some(doc) = self.attempt(domain, base, &mut tried, &mut last_error).await {
                return Ok(doc);
            }
        }

        Err(last_error)
    }

    /// Try one base URL unless it was already asked in this query.
    async fn attempt(
        &self,
        domain: &str,
        base: &str,
        tried: &mut Vec<String>,
        last_error: &mut TransportError,
    ) -> Option<RdapDocument> {
        let url = domain_url(base, domain);
        if tried.contains(&url) {
            return None;
        }

        let result = self.fetch_with_retry(&url).await;
        tried.push(url.clone());

        match result {
            Ok(doc) => {
                tracing::debug!(domain, url = %doc.url, "RDAP document received");
                Some(doc)
            }
            Err(e) => {
                tracing::debug!(domain, url = %url, error = %e, "RDAP candidate failed");
                *last_error = e;
                None
            }
        }
    }

    /// One request plus at most one retry for transient failures.
    async fn fetch_with_retry(&self, url: &str) -> Result<RdapDocument, TransportError> {
        match self.fetch(url).await {
            Ok(doc) => Ok(doc),
            Err((e, true)) => {
                tracing::debug!(url, error = %e, "Retrying RDAP request");
                self.fetch(url).await.map_err(|(e, _)| e)
            }
            Err((e, false)) => Err(e),
        }
    }

    /// Single request. The flag on the error says whether a retry may help.
    async fn fetch(&self, url: &str) -> Result<RdapDocument, (TransportError, bool)> {
        let response = self
            .http
            .get(url, &[("Accept", "application/rdap+json")], self.timeout)
            .await
            .map_err(|e| {
                let retry = e.is_retryable();
                (e, retry)
            })?;

        if !response.is_success() {
            let retry = response.status == 429 || response.status >= 500;
            return Err((
                TransportError::malformed(url, format!("HTTP {}", response.status)),
                retry,
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| (TransportError::malformed(url, format!("not JSON: {}", e)), false))?;

        let empty = match &json {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return Err((TransportError::malformed(url, "empty JSON body"), false));
        }

        Ok(RdapDocument {
            url: url.to_string(),
            host: host_of(url),
            json,
            body: response.body,
        })
    }
}

fn domain_url(base: &str, domain: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, domain)
    } else {
        format!("{}/{}", base, domain)
    }
}

/// Host part of a URL, or the URL itself when it does not parse.
pub(crate) fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::registry::BOOTSTRAP_URL;
    use crate::protocols::transport::HttpResponse;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers per URL from a script; each URL's replies are consumed in order.
    struct ScriptedHttp {
        replies: Mutex<HashMap<String, Vec<Result<HttpResponse, TransportError>>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedHttp {
        fn new() -> Self {
            Self {
                replies: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn reply(self, url: &str, status: u16, body: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push(Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }));
            self
        }

        fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn get(
            &self,
            url: &str,
            _headers: &[(&str, &str)],
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Err(TransportError::refused(url, "unreachable")),
            }
        }

        async fn post(
            &self,
            url: &str,
            _headers: &[(&str, &str)],
            _body: &str,
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            Err(TransportError::refused(url, "unused"))
        }
    }

    fn client(http: Arc<ScriptedHttp>, use_bootstrap: bool) -> RdapClient {
        RdapClient::new(
            http,
            Arc::new(BootstrapCache::new()),
            Duration::from_secs(3),
            use_bootstrap,
            vec!["https://rdap.org/domain/".to_string()],
        )
    }

    const VERISIGN: &str = "https://rdap.verisign.com/com/v1/domain/example.com";
    const MIRROR: &str = "https://rdap.org/domain/example.com";

    #[tokio::test]
    async fn test_candidate_order_without_bootstrap() {
        let http = Arc::new(ScriptedHttp::new());
        let _ = client(http.clone(), false).query("example.com").await;

        let mut order = http.calls.lock().unwrap().clone();
        order.dedup();
        assert_eq!(order, vec![VERISIGN.to_string(), MIRROR.to_string()]);
    }

    #[tokio::test]
    async fn test_builtin_endpoint_answers_before_bootstrap() {
        let http = Arc::new(ScriptedHttp::new().reply(VERISIGN, 200, r#"{"ldhName":"EXAMPLE.COM"}"#));
        let rdap = client(http.clone(), true);

        rdap.query("example.com").await.unwrap();
        assert_eq!(http.calls_to(BOOTSTRAP_URL), 0);

        // Later queries fall through to bootstrap; its failed fetch is
        // remembered instead of being repeated on every lookup
        rdap.query("example.com").await.unwrap_err();
        rdap.query("example.com").await.unwrap_err();
        assert_eq!(http.calls_to(BOOTSTRAP_URL), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_candidate_for_unknown_tld() {
        let bootstrap = serde_json::json!({
            "services": [[["museum"], ["https://rdap.museum.example/"]]]
        })
        .to_string();
        let museum = "https://rdap.museum.example/domain/louvre.museum";
        let http = Arc::new(
            ScriptedHttp::new()
                .reply(BOOTSTRAP_URL, 200, &bootstrap)
                .reply(museum, 200, r#"{"ldhName":"LOUVRE.MUSEUM"}"#),
        );

        let doc = client(http.clone(), true).query("louvre.museum").await.unwrap();

        assert_eq!(doc.host, "rdap.museum.example");
        assert_eq!(*http.calls.lock().unwrap(), vec![BOOTSTRAP_URL.to_string(), museum.to_string()]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let http = Arc::new(
            ScriptedHttp::new()
                .reply(VERISIGN, 200, r#"{"ldhName":"EXAMPLE.COM"}"#)
                .reply(MIRROR, 200, r#"{"ldhName":"mirror"}"#),
        );
        let doc = client(http.clone(), false).query("example.com").await.unwrap();

        assert_eq!(doc.host, "rdap.verisign.com");
        assert_eq!(doc.json["ldhName"], "EXAMPLE.COM");
        assert_eq!(http.calls_to(MIRROR), 0);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_once_then_next_candidate() {
        let http = Arc::new(
            ScriptedHttp::new()
                .reply(VERISIGN, 503, "")
                .reply(VERISIGN, 503, "")
                .reply(MIRROR, 200, r#"{"ldhName":"example.com"}"#),
        );
        let doc = client(http.clone(), false).query("example.com").await.unwrap();

        assert_eq!(doc.host, "rdap.org");
        assert_eq!(http.calls_to(VERISIGN), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let http = Arc::new(ScriptedHttp::new().reply(VERISIGN, 404, ""));
        let err = client(http.clone(), false).query("example.com").await.unwrap_err();

        assert_eq!(http.calls_to(VERISIGN), 1);
        // The mirror was unreachable, so its failure is the one reported
        assert!(matches!(err, TransportError::Refused { .. }));
    }

    #[tokio::test]
    async fn test_empty_or_invalid_json_is_rejected() {
        let http = Arc::new(
            ScriptedHttp::new()
                .reply(VERISIGN, 200, "{}")
                .reply(MIRROR, 200, "<html>"),
        );
        let err = client(http, false).query("example.com").await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse { .. }));
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://rdap.nominet.uk/domain/x.co.uk"), "rdap.nominet.uk");
        assert_eq!(host_of("not a url"), "not a url");
    }
}
