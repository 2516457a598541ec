//! RDAP registry mappings and IANA bootstrap discovery.
//!
//! This module provides the built-in TLD to RDAP endpoint map and the
//! bootstrap cache that fills gaps from the IANA registry at
//! `https://data.iana.org/rdap/dns.json`.

use crate::protocols::transport::HttpClient;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// IANA RDAP bootstrap document for DNS names.
pub const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// How long a fetched bootstrap document stays fresh.
pub const BOOTSTRAP_TTL: Duration = Duration::from_secs(3600);

/// How long a failed fetch suppresses further attempts.
pub const BOOTSTRAP_FAILURE_TTL: Duration = Duration::from_secs(300);

/// Built-in RDAP registry mappings.
///
/// A map of TLD strings to their RDAP endpoint base URLs. Every URL
/// ends in `/domain/` so the domain can be appended directly.
pub fn builtin_rdap_endpoints() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        (
            "org",
            "https://rdap.publicinterestregistry.org/rdap/domain/",
        ),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        // Google TLDs
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        // CentralNic managed gTLDs
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        // Identity Digital managed TLDs
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        // ccTLDs with working RDAP endpoints
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
        ("au", "https://rdap.cctld.au/rdap/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("br", "https://rdap.registro.br/domain/"),
        ("in", "https://rdap.nixiregistry.in/rdap/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
        // NOTE: co, eu, it, jp, es, cn have no working RDAP endpoint and go
        // through bootstrap discovery or WHOIS.
    ])
}

/// Built-in RDAP base URL for a registry suffix.
///
/// Compound suffixes (`co.uk`) fall back to their final label, since the
/// national registry's RDAP server answers for its second-level zones too.
pub fn rdap_base_for(suffix: &str) -> Option<&'static str> {
    let registry = builtin_rdap_endpoints();
    let suffix = suffix.to_lowercase();

    registry.get(suffix.as_str()).copied().or_else(|| {
        suffix
            .rsplit('.')
            .next()
            .and_then(|last| registry.get(last).copied())
    })
}

/// Whether a built-in RDAP endpoint exists for the suffix.
pub fn has_rdap_endpoint(suffix: &str) -> bool {
    rdap_base_for(suffix).is_some()
}

/// Parse the IANA bootstrap document into TLD -> base URL.
///
/// The document's `services` array holds `[[tld, ...], [url, ...]]` pairs;
/// the first URL of each pair is taken and normalized to end in `/domain/`.
pub fn parse_bootstrap(json: &serde_json::Value) -> HashMap<String, String> {
    let mut endpoints = HashMap::new();

    let Some(services) = json.get("services").and_then(|s| s.as_array()) else {
        return endpoints;
    };

    for service in services {
        let Some(pair) = service.as_array() else {
            continue;
        };
        if pair.len() < 2 {
            continue;
        }

        let url = pair[1]
            .as_array()
            .and_then(|urls| urls.first())
            .and_then(|u| u.as_str());

        if let (Some(url), Some(tlds)) = (url, pair[0].as_array()) {
            let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
            for tld in tlds.iter().filter_map(|t| t.as_str()) {
                endpoints.insert(tld.to_lowercase(), endpoint.clone());
            }
        }
    }

    endpoints
}

/// A fetched bootstrap document and when it was fetched.
#[derive(Debug, Clone)]
struct BootstrapEntry {
    endpoints: HashMap<String, String>,
    fetched_at: Instant,
}

/// Read-through cache of the IANA RDAP bootstrap registry.
///
/// Owned by a resolver instance. A stale or missing entry is refetched on
/// the next lookup. A failed fetch means no bootstrap URL, and no new fetch
/// is attempted until `failure_ttl` has passed.
#[derive(Debug)]
pub struct BootstrapCache {
    entry: RwLock<Option<BootstrapEntry>>,
    failed_at: RwLock<Option<Instant>>,
    ttl: Duration,
    failure_ttl: Duration,
    url: String,
}

impl BootstrapCache {
    pub fn new() -> Self {
        Self::with_ttl(BOOTSTRAP_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            failed_at: RwLock::new(None),
            ttl,
            failure_ttl: BOOTSTRAP_FAILURE_TTL,
            url: BOOTSTRAP_URL.to_string(),
        }
    }

    pub fn with_failure_ttl(mut self, failure_ttl: Duration) -> Self {
        self.failure_ttl = failure_ttl;
        self
    }

    /// Base URL for `tld` from the bootstrap registry, fetching the document
    /// when the cache is empty or stale.
    pub async fn lookup(
        &self,
        tld: &str,
        http: &dyn HttpClient,
        timeout: Duration,
    ) -> Option<String> {
        let tld = tld.to_lowercase();

        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if entry.fetched_at.elapsed() <= self.ttl {
                    return entry.endpoints.get(&tld).cloned();
                }
            }
        }

        if let Some(failed_at) = *self.failed_at.read().await {
            if failed_at.elapsed() < self.failure_ttl {
                return None;
            }
        }

        let Some(endpoints) = self.fetch(http, timeout).await else {
            *self.failed_at.write().await = Some(Instant::now());
            return None;
        };
        *self.failed_at.write().await = None;
        let found = endpoints.get(&tld).cloned();

        *self.entry.write().await = Some(BootstrapEntry {
            endpoints,
            fetched_at: Instant::now(),
        });

        found
    }

    async fn fetch(&self, http: &dyn HttpClient, timeout: Duration) -> Option<HashMap<String, String>> {
        let response = match http.get(&self.url, &[("Accept", "application/json")], timeout).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::warn!(status = response.status, "Bootstrap registry returned an error status");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch bootstrap registry");
                return None;
            }
        };

        let json: serde_json::Value = match serde_json::from_str(&response.body) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse bootstrap JSON");
                return None;
            }
        };

        let endpoints = parse_bootstrap(&json);
        if endpoints.is_empty() {
            tracing::warn!("Bootstrap JSON has no usable services");
            return None;
        }

        tracing::debug!(tlds = endpoints.len(), "Bootstrap registry loaded");
        Some(endpoints)
    }

    /// Number of cached TLDs and whether the cache is stale.
    pub async fn stats(&self) -> (usize, bool) {
        match self.entry.read().await.as_ref() {
            Some(entry) => (entry.endpoints.len(), entry.fetched_at.elapsed() > self.ttl),
            None => (0, true),
        }
    }
}

impl Default for BootstrapCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::protocols::transport::HttpResponse;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BootstrapHttp {
        calls: AtomicUsize,
        body: String,
    }

    #[async_trait]
    impl HttpClient for BootstrapHttp {
        async fn get(
            &self,
            _url: &str,
            _headers: &[(&str, &str)],
            _timeout: Duration,
        ) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                body: self.body.clone(),
            })
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

    fn bootstrap_body() -> String {
        serde_json::json!({
            "version": "1.0",
            "services": [
                [["museum"], ["https://rdap.museum.example/rdap/"]],
                [["shop", "store"], ["https://rdap.gmo.example/rdap", "http://mirror.example/"]],
                ["malformed"]
            ]
        })
        .to_string()
    }

    #[test]
    fn test_registry_map_contains_common_tlds() {
        let registry = builtin_rdap_endpoints();
        assert!(registry.contains_key("com"));
        assert!(registry.contains_key("org"));
        assert!(registry.contains_key("uk"));
    }

    #[test]
    fn test_all_endpoints_are_valid_https_urls() {
        for (tld, endpoint) in &builtin_rdap_endpoints() {
            assert!(endpoint.starts_with("https://"), "{} must use HTTPS", tld);
            assert!(endpoint.ends_with("/domain/"), "{} must end with /domain/", tld);
        }
    }

    #[test]
    fn test_rdap_base_for_compound_falls_back_to_last_label() {
        assert_eq!(rdap_base_for("co.uk"), Some("https://rdap.nominet.uk/domain/"));
        assert!(has_rdap_endpoint("COM"));
        assert!(!has_rdap_endpoint("museum"));
    }

    #[test]
    fn test_parse_bootstrap() {
        let json: serde_json::Value = serde_json::from_str(&bootstrap_body()).unwrap();
        let endpoints = parse_bootstrap(&json);

        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints["museum"], "https://rdap.museum.example/rdap/domain/");
        assert_eq!(endpoints["store"], "https://rdap.gmo.example/rdap/domain/");
        assert!(parse_bootstrap(&serde_json::json!({"services": 5})).is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_cache_fetches_once_while_fresh() {
        let http = BootstrapHttp {
            calls: AtomicUsize::new(0),
            body: bootstrap_body(),
        };
        let cache = BootstrapCache::new();

        let first = cache.lookup("shop", &http, Duration::from_secs(3)).await;
        let second = cache.lookup("museum", &http, Duration::from_secs(3)).await;
        let missing = cache.lookup("nope", &http, Duration::from_secs(3)).await;

        assert_eq!(first.as_deref(), Some("https://rdap.gmo.example/rdap/domain/"));
        assert!(second.is_some());
        assert!(missing.is_none());
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().await, (3, false));
    }

    #[tokio::test]
    async fn test_bootstrap_cache_refetches_when_stale() {
        let http = BootstrapHttp {
            calls: AtomicUsize::new(0),
            body: bootstrap_body(),
        };
        let cache = BootstrapCache::with_ttl(Duration::ZERO);

        cache.lookup("shop", &http, Duration::from_secs(3)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.lookup("shop", &http, Duration::from_secs(3)).await;

        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bootstrap_cache_survives_bad_document() {
        let http = BootstrapHttp {
            calls: AtomicUsize::new(0),
            body: "<html>maintenance</html>".to_string(),
        };
        let cache = BootstrapCache::new();

        tokio_test::block_on(async {
            assert!(cache.lookup("shop", &http, Duration::from_secs(3)).await.is_none());
            assert!(cache.lookup("store", &http, Duration::from_secs(3)).await.is_none());
            assert_eq!(cache.stats().await, (0, true));
        });

        // The failure is remembered
        assert_eq!(http.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_cache_retries_after_failure_expires() {
        let http = BootstrapHttp {
            calls: AtomicUsize::new(0),
            body: "not json".to_string(),
        };
        let cache = BootstrapCache::new().with_failure_ttl(Duration::ZERO);

        cache.lookup("shop", &http, Duration::from_secs(3)).await;
        cache.lookup("shop", &http, Duration::from_secs(3)).await;

        assert_eq!(http.calls.load(Ordering::SeqCst), 2);
    }
}
