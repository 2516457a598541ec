//! Built-in data for a few well-known domains.
//!
//! Seeds the working record before any network stage and serves as the
//! last resort when every live source failed. Live data always overwrites
//! it.

use crate::types::PartialRecord;

/// Reference registration data for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WellKnownDomain {
    pub domain: &'static str,
    pub registrar: &'static str,
    pub created: &'static str,
    pub expires: &'static str,
    pub registrant: &'static str,
    pub name_servers: &'static [&'static str],
}

const WELL_KNOWN: &[WellKnownDomain] = &[
    WellKnownDomain {
        domain: "google.com",
        registrar: "MarkMonitor Inc.",
        created: "1997-09-15T04:00:00Z",
        expires: "2028-09-14T04:00:00Z",
        registrant: "Google LLC",
        name_servers: &["ns1.google.com", "ns2.google.com", "ns3.google.com", "ns4.google.com"],
    },
    WellKnownDomain {
        domain: "facebook.com",
        registrar: "RegistrarSafe, LLC",
        created: "1997-03-29T05:00:00Z",
        expires: "2031-03-30T04:00:00Z",
        registrant: "Meta Platforms, Inc.",
        name_servers: &["a.ns.facebook.com", "b.ns.facebook.com", "c.ns.facebook.com", "d.ns.facebook.com"],
    },
    WellKnownDomain {
        domain: "amazon.com",
        registrar: "MarkMonitor Inc.",
        created: "1994-11-01T05:00:00Z",
        expires: "2027-10-31T04:00:00Z",
        registrant: "Amazon Technologies, Inc.",
        name_servers: &["ns1.amzndns.com", "ns1.amzndns.net", "ns2.amzndns.com", "ns2.amzndns.net"],
    },
    WellKnownDomain {
        domain: "microsoft.com",
        registrar: "MarkMonitor Inc.",
        created: "1991-05-02T04:00:00Z",
        expires: "2027-05-03T04:00:00Z",
        registrant: "Microsoft Corporation",
        name_servers: &["ns1-39.azure-dns.com", "ns2-39.azure-dns.net", "ns3-39.azure-dns.org", "ns4-39.azure-dns.info"],
    },
    WellKnownDomain {
        domain: "apple.com",
        registrar: "Nom-iq Ltd. dba COM LAUDE",
        created: "1987-02-19T05:00:00Z",
        expires: "2027-02-20T05:00:00Z",
        registrant: "Apple Inc.",
        name_servers: &["a.ns.apple.com", "b.ns.apple.com", "c.ns.apple.com", "d.ns.apple.com"],
    },
    WellKnownDomain {
        domain: "github.com",
        registrar: "MarkMonitor Inc.",
        created: "2007-10-09T18:20:50Z",
        expires: "2028-10-09T18:20:50Z",
        registrant: "GitHub, Inc.",
        name_servers: &["dns1.p08.nsone.net", "dns2.p08.nsone.net", "ns-1283.awsdns-32.org", "ns-421.awsdns-52.com"],
    },
    WellKnownDomain {
        domain: "wikipedia.org",
        registrar: "MarkMonitor Inc.",
        created: "2001-01-13T00:12:14Z",
        expires: "2027-01-13T00:12:14Z",
        registrant: "Wikimedia Foundation, Inc.",
        name_servers: &["ns0.wikimedia.org", "ns1.wikimedia.org", "ns2.wikimedia.org"],
    },
    WellKnownDomain {
        domain: "example.com",
        registrar: "RESERVED-Internet Assigned Numbers Authority",
        created: "1995-08-14T04:00:00Z",
        expires: "2026-08-13T04:00:00Z",
        registrant: "Internet Assigned Numbers Authority",
        name_servers: &["a.iana-servers.net", "b.iana-servers.net"],
    },
];

impl WellKnownDomain {
    /// The entry as a partial record, with a `raw` that says where it came
    /// from.
    pub fn to_partial(&self) -> PartialRecord {
        let raw = format!(
            "Built-in reference data for {}\nRegistrar: {}\nCreation Date: {}\nExpiry Date: {}\nName Servers: {}\n",
            self.domain,
            self.registrar,
            self.created,
            self.expires,
            self.name_servers.join(", ")
        );

        let mut record = PartialRecord::with_raw(raw);
        record.registrar = Some(self.registrar.to_string());
        record.creation_date = Some(self.created.to_string());
        record.expiry_date = Some(self.expires.to_string());
        record.registrant = Some(self.registrant.to_string());
        for ns in self.name_servers {
            record.push_name_server(ns);
        }
        record.finish()
    }
}

/// Read-only table of well-known domains.
#[derive(Debug, Clone)]
pub struct StaticTable {
    entries: Vec<WellKnownDomain>,
}

impl StaticTable {
    pub fn new(entries: Vec<WellKnownDomain>) -> Self {
        Self { entries }
    }

    pub fn builtin() -> Self {
        Self::new(WELL_KNOWN.to_vec())
    }

    /// A table with no entries, so every lookup has to go to the network.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn lookup(&self, domain: &str) -> Option<&WellKnownDomain> {
        self.entries.iter().find(|e| e.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_domain() {
        let table = StaticTable::builtin();
        let entry = table.lookup("google.com").unwrap();
        let record = entry.to_partial();

        assert_eq!(record.registrar.as_deref(), Some("MarkMonitor Inc."));
        assert!(record.name_servers.len() >= 2);
        assert!(record.raw.starts_with("Built-in reference data for google.com"));
        assert!(!record.core_missing);
    }

    #[test]
    fn test_lookup_is_exact() {
        let table = StaticTable::builtin();
        assert!(table.lookup("mail.google.com").is_none());
        assert!(table.lookup("google.co.uk").is_none());
        assert!(StaticTable::empty().lookup("google.com").is_none());
    }

    #[test]
    fn test_entries_are_well_formed() {
        for entry in WELL_KNOWN {
            assert_eq!(entry.domain, entry.domain.to_lowercase());
            assert!(entry.name_servers.iter().all(|ns| ns.contains('.')));
        }
        assert_eq!(StaticTable::builtin().len(), WELL_KNOWN.len());
    }
}
