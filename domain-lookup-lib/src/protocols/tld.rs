//! TLD to WHOIS server mapping.
//!
//! A static, read-only table: built-in defaults, optionally layered with
//! user overrides from the configuration file. Compound suffixes such as
//! `co.uk` are matched before the final label.

use crate::protocols::registry::has_rdap_endpoint;
use crate::types::ServerInfo;
use crate::utils::normalize_domain;
use std::collections::HashMap;

/// Two-label public suffixes that have their own registry host.
const COMPOUND_SUFFIXES: &[(&str, &str)] = &[
    ("co.uk", "whois.nic.uk"),
    ("org.uk", "whois.nic.uk"),
    ("me.uk", "whois.nic.uk"),
    ("ac.uk", "whois.ja.net"),
    ("gov.uk", "whois.ja.net"),
    ("com.au", "whois.auda.org.au"),
    ("net.au", "whois.auda.org.au"),
    ("org.au", "whois.auda.org.au"),
    ("com.cn", "whois.cnnic.cn"),
    ("net.cn", "whois.cnnic.cn"),
    ("org.cn", "whois.cnnic.cn"),
    ("co.jp", "whois.jprs.jp"),
    ("ne.jp", "whois.jprs.jp"),
    ("or.jp", "whois.jprs.jp"),
    ("com.br", "whois.registro.br"),
    ("co.nz", "whois.irs.net.nz"),
    ("co.za", "whois.registry.net.za"),
    ("com.mx", "whois.mx"),
    ("co.in", "whois.registry.in"),
    ("com.tr", "whois.trabis.gov.tr"),
];

/// Single-label TLDs.
const TLD_SERVERS: &[(&str, &str)] = &[
    ("com", "whois.verisign-grs.com"),
    ("net", "whois.verisign-grs.com"),
    ("org", "whois.pir.org"),
    ("info", "whois.nic.info"),
    ("biz", "whois.nic.biz"),
    ("io", "whois.nic.io"),
    ("ai", "whois.nic.ai"),
    ("co", "whois.nic.co"),
    ("me", "whois.nic.me"),
    ("app", "whois.nic.google"),
    ("dev", "whois.nic.google"),
    ("xyz", "whois.nic.xyz"),
    ("us", "whois.nic.us"),
    ("uk", "whois.nic.uk"),
    ("de", "whois.denic.de"),
    ("fr", "whois.nic.fr"),
    ("nl", "whois.domain-registry.nl"),
    ("eu", "whois.eu"),
    ("it", "whois.nic.it"),
    ("es", "whois.nic.es"),
    ("ca", "whois.cira.ca"),
    ("au", "whois.auda.org.au"),
    ("jp", "whois.jprs.jp"),
    ("cn", "whois.cnnic.cn"),
    ("ru", "whois.tcinet.ru"),
    ("br", "whois.registro.br"),
    ("in", "whois.registry.in"),
    ("tv", "whois.nic.tv"),
    ("cc", "ccwhois.verisign-grs.com"),
];

/// Read-only TLD to WHOIS host mapping.
#[derive(Debug, Clone)]
pub struct TldTable {
    servers: HashMap<String, String>,
}

impl TldTable {
    /// Table with only the built-in entries.
    pub fn builtin() -> Self {
        let servers = COMPOUND_SUFFIXES
            .iter()
            .chain(TLD_SERVERS.iter())
            .map(|(tld, host)| (tld.to_string(), host.to_string()))
            .collect();

        Self { servers }
    }

    /// Built-in table with user entries layered on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (tld, host) in overrides {
            let tld = tld.trim().trim_start_matches('.').to_lowercase();
            let host = host.trim();
            if !tld.is_empty() && !host.is_empty() {
                table.servers.insert(tld, host.to_string());
            }
        }
        table
    }

    /// Look up the WHOIS host for a domain.
    ///
    /// Returns `None` when the domain has fewer than two labels or neither
    /// its compound suffix nor its final label is known. Callers treat that
    /// as "use the generic mirrors".
    pub fn lookup(&self, domain: &str) -> Option<ServerInfo> {
        let domain = normalize_domain(domain);
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return None;
        }

        // Compound suffix first; only meaningful with three or more labels
        if labels.len() >= 3 {
            let compound = labels[labels.len() - 2..].join(".");
            if let Some(host) = self.servers.get(&compound) {
                return Some(ServerInfo {
                    host: host.clone(),
                    supports_rdap: has_rdap_endpoint(&compound),
                });
            }
        }

        let tld = labels[labels.len() - 1];
        self.servers.get(tld).map(|host| ServerInfo {
            host: host.clone(),
            supports_rdap: has_rdap_endpoint(tld),
        })
    }

    /// Number of known suffixes.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for TldTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve the WHOIS host for a domain against the built-in table.
pub fn resolve_server(domain: &str) -> Option<ServerInfo> {
    TldTable::builtin().lookup(domain)
}

/// The registry suffix of a domain: a known compound suffix, else the
/// final label.
pub fn registry_suffix(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return None;
    }

    if labels.len() >= 3 {
        let compound = labels[labels.len() - 2..].join(".");
        if COMPOUND_SUFFIXES.iter().any(|(s, _)| *s == compound) {
            return Some(compound);
        }
    }

    labels.last().map(|l| l.to_lowercase())
}
