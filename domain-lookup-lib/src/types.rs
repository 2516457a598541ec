//! Core data types for registration lookups.
//!
//! This module defines the record handed back to callers, the partial
//! shape every parser and adapter produces, the per-call options, and the
//! resolver configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Sentinel used for every data field a lookup could not fill.
pub const UNKNOWN: &str = "unknown";

/// Which pipeline produced the final answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceProtocol {
    Whois,
    Rdap,
    Aggregator,
    Static,
    Error,
}

/// Registration status derived from everything the resolver saw.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    /// At least one source confirmed an existing registration
    Registered,
    /// A registry answered with a "not found"/"available" response
    Available,
    /// Could not be determined either way
    Indeterminate,
}

/// Canonical lookup result.
///
/// Built fresh for every call to [`crate::DomainResolver::resolve`] and never
/// touched again once returned. Data fields carry [`UNKNOWN`] rather than
/// being absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    /// Queried domain, lower-cased with scheme and `www.` removed
    pub domain: String,

    /// Pipeline that supplied the final data
    pub source_protocol: SourceProtocol,

    /// WHOIS host, RDAP host or aggregator name behind `source_protocol`
    pub source_host: Option<String>,

    pub registrar: String,
    pub registration_date: String,
    pub expiry_date: String,

    /// Discovery order, deduplicated, every entry contains a dot
    pub name_servers: Vec<String>,

    pub registrant: String,

    /// Status tokens, comma-joined when a source reports several
    pub status: String,

    /// Underlying payloads, or a diagnostic when every source failed.
    /// Never empty.
    pub raw_data: String,

    /// Provenance or partial-failure note
    pub message: Option<String>,

    /// A more specific WHOIS server was named; query it with `server` set
    pub needs_follow_up: bool,

    /// The server named by the referral, if any
    pub referral_server: Option<String>,

    /// Registered / available / indeterminate
    pub registration: RegistrationState,
}

impl NormalizedRecord {
    /// Whether a data field holds a real value.
    pub fn is_known(value: &str) -> bool {
        !value.is_empty() && value != UNKNOWN
    }
}

/// Intermediate shape produced by a single parser or adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub registrar: Option<String>,
    pub creation_date: Option<String>,
    pub expiry_date: Option<String>,
    pub registrant: Option<String>,
    pub status: Option<String>,
    pub name_servers: Vec<String>,

    /// More specific WHOIS server named by the payload
    pub referral: Option<String>,

    /// Payload exactly as received
    pub raw: String,

    /// Registrar, creation and expiry are all unset
    pub core_missing: bool,
}

impl PartialRecord {
    /// Create an empty record that keeps the raw payload.
    pub fn with_raw<R: Into<String>>(raw: R) -> Self {
        Self {
            raw: raw.into(),
            core_missing: true,
            ..Default::default()
        }
    }

    /// Add a name server if it looks like a host and is not already present.
    ///
    /// Values are lower-cased, cut at the first whitespace (some grammars
    /// append IP addresses) and stripped of a trailing root dot.
    pub fn push_name_server(&mut self, value: &str) {
        let host = value
            .split_whitespace()
            .next()
            .unwrap_or("")
            .trim_end_matches('.')
            .to_lowercase();

        if host.contains('.') && !self.name_servers.contains(&host) {
            self.name_servers.push(host);
        }
    }

    /// True when registrar, creation date or expiry date is set.
    pub fn has_core_data(&self) -> bool {
        self.registrar.is_some() || self.creation_date.is_some() || self.expiry_date.is_some()
    }

    /// True when any registration data at all was extracted.
    pub fn has_data(&self) -> bool {
        self.has_core_data() || !self.name_servers.is_empty()
    }

    /// Recompute `core_missing` after the fields were filled.
    pub fn finish(mut self) -> Self {
        self.core_missing = !self.has_core_data();
        self
    }
}

/// Store `value` into `slot` if the slot is empty and the value is usable.
pub(crate) fn fill(slot: &mut Option<String>, value: &str) {
    let value = value.trim();
    if slot.is_none() && !value.is_empty() && !value.eq_ignore_ascii_case(UNKNOWN) {
        *slot = Some(value.to_string());
    }
}

/// Which sources a call may use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// RDAP, then WHOIS, then aggregators
    #[default]
    Auto,
    /// RDAP only (plus the static fallback)
    Rdap,
    /// Skip RDAP
    Whois,
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Protocol::Auto),
            "rdap" => Ok(Protocol::Rdap),
            "whois" => Ok(Protocol::Whois),
            other => Err(format!(
                "Unknown protocol '{}', expected auto, rdap or whois",
                other
            )),
        }
    }
}

/// Per-call options for [`crate::DomainResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Force a specific WHOIS host; skips RDAP
    pub server: Option<String>,

    pub protocol: Protocol,

    /// Overall budget for this call; the configured default when `None`
    pub timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn with_server<S: Into<String>>(mut self, server: S) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// WHOIS host for a TLD and whether RDAP is known to serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub host: String,
    pub supports_rdap: bool,
}

/// Response shape of a third-party aggregator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AggregatorKind {
    WhoisXml,
    WhoisFreaks,
    WhoDat,
    Generic,
}

/// HTTP method an aggregator expects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// A configured third-party aggregator API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorProvider {
    /// Name reported as `source_host`
    pub name: String,

    pub kind: AggregatorKind,

    /// URL template; `{domain}` and `{key}` are substituted
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AggregatorProvider {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, kind: AggregatorKind, url: U) -> Self {
        Self {
            name: name.into(),
            kind,
            url: url.into(),
            api_key: None,
            method: HttpMethod::Get,
            enabled: true,
        }
    }

    pub fn with_api_key<K: Into<String>>(mut self, key: K) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Enabled, and has a key whenever the URL template needs one.
    pub fn is_usable(&self) -> bool {
        self.enabled && (!self.url.contains("{key}") || self.api_key.is_some())
    }

    /// Concrete request URL for a domain.
    pub fn request_url(&self, domain: &str) -> String {
        self.url
            .replace("{domain}", domain)
            .replace("{key}", self.api_key.as_deref().unwrap_or(""))
    }
}

/// Aggregators shipped with the library. Keyed ones stay idle until a key
/// is configured.
pub fn default_aggregators() -> Vec<AggregatorProvider> {
    vec![
        AggregatorProvider::new(
            "who-dat",
            AggregatorKind::WhoDat,
            "https://who-dat.as93.net/{domain}",
        ),
        AggregatorProvider::new(
            "whoisxmlapi",
            AggregatorKind::WhoisXml,
            "https://www.whoisxmlapi.com/whoisserver/WhoisService?apiKey={key}&domainName={domain}&outputFormat=JSON",
        ),
        AggregatorProvider::new(
            "whoisfreaks",
            AggregatorKind::WhoisFreaks,
            "https://api.whoisfreaks.com/v1.0/whois?apiKey={key}&whois=live&domainName={domain}",
        ),
    ]
}

/// Configuration for a [`crate::DomainResolver`].
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Per-URL RDAP budget. Default: 3 seconds
    pub rdap_timeout: Duration,

    /// Per-host WHOIS budget. Default: 15 seconds
    pub whois_timeout: Duration,

    /// Per-call aggregator budget. Default: 10 seconds
    pub aggregator_timeout: Duration,

    /// End-to-end budget of one resolution. Default: 25 seconds
    pub overall_timeout: Duration,

    /// Consult the IANA RDAP bootstrap registry. Default: true
    pub enable_bootstrap: bool,

    /// Run the aggregator stage. Default: true
    pub enable_aggregators: bool,

    /// Generic WHOIS hosts tried after the TLD host, in order
    pub whois_mirrors: Vec<String>,

    /// Public RDAP base URLs tried last, in order
    pub rdap_mirrors: Vec<String>,

    pub aggregators: Vec<AggregatorProvider>,

    /// TLD (or compound suffix) -> WHOIS host, layered over the built-in table
    pub server_overrides: HashMap<String, String>,

    /// Default protocol when a call leaves it at `Auto`
    pub protocol: Protocol,

    /// Domains the CLI resolves at once. Default: 5, Range: 1-50
    pub concurrency: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            rdap_timeout: Duration::from_secs(3),
            whois_timeout: Duration::from_secs(15),
            aggregator_timeout: Duration::from_secs(10),
            overall_timeout: Duration::from_secs(25),
            enable_bootstrap: true,
            enable_aggregators: true,
            whois_mirrors: vec![
                "whois.iana.org".to_string(),
                "whois.verisign-grs.com".to_string(),
                "whois.internic.net".to_string(),
            ],
            rdap_mirrors: vec!["https://rdap.org/domain/".to_string()],
            aggregators: default_aggregators(),
            server_overrides: HashMap::new(),
            protocol: Protocol::Auto,
            concurrency: 5,
        }
    }
}

impl LookupConfig {
    pub fn with_rdap_timeout(mut self, timeout: Duration) -> Self {
        self.rdap_timeout = timeout;
        self
    }

    pub fn with_whois_timeout(mut self, timeout: Duration) -> Self {
        self.whois_timeout = timeout;
        self
    }

    pub fn with_aggregator_timeout(mut self, timeout: Duration) -> Self {
        self.aggregator_timeout = timeout;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    /// Enable or disable IANA bootstrap discovery.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.enable_bootstrap = enabled;
        self
    }

    pub fn with_aggregators(mut self, providers: Vec<AggregatorProvider>) -> Self {
        self.aggregators = providers;
        self
    }

    pub fn with_aggregators_enabled(mut self, enabled: bool) -> Self {
        self.enable_aggregators = enabled;
        self
    }

    pub fn with_whois_mirrors(mut self, mirrors: Vec<String>) -> Self {
        self.whois_mirrors = mirrors;
        self
    }

    pub fn with_rdap_mirrors(mut self, mirrors: Vec<String>) -> Self {
        self.rdap_mirrors = mirrors;
        self
    }

    pub fn with_server_override<T: Into<String>, H: Into<String>>(mut self, tld: T, host: H) -> Self {
        self.server_overrides
            .insert(tld.into().to_lowercase(), host.into());
        self
    }

    /// Caps concurrency at 50.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 50);
        self
    }
}

impl std::fmt::Display for SourceProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceProtocol::Whois => write!(f, "WHOIS"),
            SourceProtocol::Rdap => write!(f, "RDAP"),
            SourceProtocol::Aggregator => write!(f, "AGGREGATOR"),
            SourceProtocol::Static => write!(f, "STATIC"),
            SourceProtocol::Error => write!(f, "ERROR"),
        }
    }
}

impl std::fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationState::Registered => write!(f, "registered"),
            RegistrationState::Available => write!(f, "available"),
            RegistrationState::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_name_server_filters_and_dedups() {
        let mut record = PartialRecord::default();
        record.push_name_server("NS1.Google.com.");
        record.push_name_server("ns1.google.com");
        record.push_name_server("ns2.google.com 216.239.34.10");
        record.push_name_server("not-a-host");
        record.push_name_server("");

        assert_eq!(record.name_servers, vec!["ns1.google.com", "ns2.google.com"]);
    }

    #[test]
    fn test_finish_sets_core_missing() {
        let record = PartialRecord::with_raw("x");
        assert!(record.clone().finish().core_missing);

        let mut record = record;
        record.expiry_date = Some("2030-01-01".to_string());
        assert!(!record.finish().core_missing);
    }

    #[test]
    fn test_fill_ignores_unknown_and_keeps_first() {
        let mut slot = None;
        fill(&mut slot, "  ");
        fill(&mut slot, "Unknown");
        assert_eq!(slot, None);
        fill(&mut slot, "First");
        fill(&mut slot, "Second");
        assert_eq!(slot.as_deref(), Some("First"));
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("RDAP".parse::<Protocol>().unwrap(), Protocol::Rdap);
        assert_eq!(" whois ".parse::<Protocol>().unwrap(), Protocol::Whois);
        assert!("ftp".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_provider_usable_requires_key_when_templated() {
        let keyed = AggregatorProvider::new("x", AggregatorKind::WhoisXml, "https://x/?k={key}&d={domain}");
        assert!(!keyed.is_usable());

        let keyed = keyed.with_api_key("abc");
        assert!(keyed.is_usable());
        assert_eq!(keyed.request_url("example.com"), "https://x/?k=abc&d=example.com");

        let open = AggregatorProvider::new("y", AggregatorKind::WhoDat, "https://y/{domain}");
        assert!(open.is_usable());
    }

    #[test]
    fn test_default_config() {
        let config = LookupConfig::default();
        assert_eq!(config.rdap_timeout, Duration::from_secs(3));
        assert_eq!(config.whois_mirrors[0], "whois.iana.org");
        assert!(config.enable_bootstrap);
        assert_eq!(LookupConfig::default().with_concurrency(500).concurrency, 50);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = NormalizedRecord {
            domain: "example.com".to_string(),
            source_protocol: SourceProtocol::Rdap,
            source_host: Some("rdap.verisign.com".to_string()),
            registrar: UNKNOWN.to_string(),
            registration_date: UNKNOWN.to_string(),
            expiry_date: UNKNOWN.to_string(),
            name_servers: vec![],
            registrant: UNKNOWN.to_string(),
            status: UNKNOWN.to_string(),
            raw_data: "{}".to_string(),
            message: None,
            needs_follow_up: false,
            referral_server: None,
            registration: RegistrationState::Indeterminate,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sourceProtocol"], "RDAP");
        assert_eq!(json["needsFollowUp"], false);
        assert_eq!(json["registration"], "indeterminate");
    }
}
