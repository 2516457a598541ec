//! Third-party WHOIS aggregator payloads into a [`PartialRecord`].
//!
//! One pure function per vendor shape. Fields that are missing or of an
//! unexpected type stay unset; the payload itself is always kept in `raw`.

use crate::types::{fill, AggregatorKind, PartialRecord};
use serde_json::Value;

/// Adapt a vendor payload according to the provider kind.
pub fn adapt(kind: AggregatorKind, json: &Value, domain: &str) -> PartialRecord {
    let record = match kind {
        AggregatorKind::WhoisXml => adapt_whoisxml(json),
        AggregatorKind::WhoisFreaks => adapt_whoisfreaks(json),
        AggregatorKind::WhoDat => adapt_whodat(json),
        AggregatorKind::Generic => adapt_generic(json),
    }
    .finish();

    tracing::debug!(
        domain,
        kind = ?kind,
        core_missing = record.core_missing,
        "Adapted aggregator payload"
    );
    record
}

/// WhoisXML API: `WhoisRecord`, with `registryData` as a second source.
pub fn adapt_whoisxml(json: &Value) -> PartialRecord {
    let mut record = PartialRecord::with_raw(json.to_string());
    let root = json.get("WhoisRecord").unwrap_or(json);
    let registry = root.get("registryData");

    for source in [Some(root), registry].into_iter().flatten() {
        set(&mut record.registrar, source, &["registrarName"]);
        set(&mut record.creation_date, source, &["createdDate"]);
        set(&mut record.expiry_date, source, &["expiresDate"]);
        set(&mut record.status, source, &["status"]);
        set(&mut record.registrant, source, &["registrant", "organization"]);
        if record.name_servers.is_empty() {
            push_servers(&mut record, path(source, &["nameServers", "hostNames"]));
        }
    }

    record.referral = registry
        .and_then(|r| text_at(r, &["whoisServer"]))
        .or_else(|| text_at(root, &["whoisServer"]));
    record
}

/// WhoisFreaks: flat snake_case object with nested contact blocks.
pub fn adapt_whoisfreaks(json: &Value) -> PartialRecord {
    let mut record = PartialRecord::with_raw(json.to_string());

    set(&mut record.registrar, json, &["domain_registrar", "registrar_name"]);
    set(&mut record.creation_date, json, &["create_date"]);
    set(&mut record.expiry_date, json, &["expiry_date"]);
    set(&mut record.status, json, &["domain_status"]);
    set(&mut record.registrant, json, &["registrant_contact", "company"]);
    set(&mut record.registrant, json, &["registrant_contact", "name"]);
    push_servers(&mut record, json.get("name_servers"));
    record.referral = text_at(json, &["whois_server"]);
    record
}

/// who-dat: `domain`, `registrar` and `registrant` sections.
pub fn adapt_whodat(json: &Value) -> PartialRecord {
    let mut record = PartialRecord::with_raw(json.to_string());

    set(&mut record.registrar, json, &["registrar", "name"]);
    set(&mut record.creation_date, json, &["domain", "created_date"]);
    set(&mut record.expiry_date, json, &["domain", "expiration_date"]);
    set(&mut record.status, json, &["domain", "status"]);
    set(&mut record.registrant, json, &["registrant", "organization"]);
    set(&mut record.registrant, json, &["registrant", "name"]);
    push_servers(&mut record, path(json, &["domain", "name_servers"]));
    record.referral = text_at(json, &["domain", "whois_server"]);
    record
}

/// Flat objects with commonly used key names.
pub fn adapt_generic(json: &Value) -> PartialRecord {
    let mut record = PartialRecord::with_raw(json.to_string());

    for key in ["registrar", "registrar_name", "registrarName"] {
        set(&mut record.registrar, json, &[key]);
    }
    for key in ["created", "date_created", "createdDate", "creation_date"] {
        set(&mut record.creation_date, json, &[key]);
    }
    for key in ["expires", "expiry_date", "expiration_date", "expiresDate"] {
        set(&mut record.expiry_date, json, &[key]);
    }
    for key in ["status", "domain_status"] {
        set(&mut record.status, json, &[key]);
    }
    for key in ["registrant", "registrant_name", "owner"] {
        set(&mut record.registrant, json, &[key]);
    }
    for key in ["nameservers", "name_servers", "nameServers"] {
        if record.name_servers.is_empty() {
            push_servers(&mut record, json.get(key));
        }
    }
    record.referral = text_at(json, &["whois_server"]).or_else(|| text_at(json, &["whoisServer"]));
    record
}

fn path<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().try_fold(json, |node, key| node.get(key))
}

/// Scalar text of a value; arrays contribute their first usable element.
fn text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => return items.iter().find_map(text),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn text_at(json: &Value, keys: &[&str]) -> Option<String> {
    path(json, keys).and_then(text)
}

fn set(slot: &mut Option<String>, json: &Value, keys: &[&str]) {
    if let Some(value) = text_at(json, keys) {
        fill(slot, &value);
    }
}

/// Name servers given as an array, or as one space/comma separated string.
fn push_servers(record: &mut PartialRecord, value: Option<&Value>) {
    match value {
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) => record.push_name_server(s),
                    // Some vendors wrap each host in an object
                    Value::Object(_) => {
                        if let Some(host) = text_at(item, &["name"]).or_else(|| text_at(item, &["ldhName"])) {
                            record.push_name_server(&host);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(Value::String(s)) => {
            for host in s.split(|c: char| c == ',' || c.is_whitespace()) {
                record.push_name_server(host);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whoisxml_prefers_top_level_then_registry_data() {
        let payload = json!({
            "WhoisRecord": {
                "domainName": "example.com",
                "registrarName": "Example Registrar, LLC",
                "registrant": {"organization": "Example Org"},
                "registryData": {
                    "createdDate": "1995-08-14T04:00:00Z",
                    "expiresDate": "2027-08-13T04:00:00Z",
                    "status": "clientDeleteProhibited clientTransferProhibited",
                    "nameServers": {"hostNames": ["A.IANA-SERVERS.NET", "B.IANA-SERVERS.NET"]},
                    "whoisServer": "whois.example-registrar.com"
                }
            }
        });

        let record = adapt(AggregatorKind::WhoisXml, &payload, "example.com");
        assert_eq!(record.registrar.as_deref(), Some("Example Registrar, LLC"));
        assert_eq!(record.creation_date.as_deref(), Some("1995-08-14T04:00:00Z"));
        assert_eq!(record.registrant.as_deref(), Some("Example Org"));
        assert_eq!(record.name_servers, vec!["a.iana-servers.net", "b.iana-servers.net"]);
        assert_eq!(record.referral.as_deref(), Some("whois.example-registrar.com"));
        assert!(!record.core_missing);
    }

    #[test]
    fn test_whoisfreaks_shape() {
        let payload = json!({
            "domain_name": "example.org",
            "create_date": "1995-08-31",
            "expiry_date": "2026-08-30",
            "domain_registrar": {"registrar_name": "Registrar Inc."},
            "name_servers": ["ns1.example.org", "ns2.example.org"],
            "domain_status": ["clientTransferProhibited"],
            "whois_server": "whois.pir.org"
        });

        let record = adapt(AggregatorKind::WhoisFreaks, &payload, "example.org");
        assert_eq!(record.registrar.as_deref(), Some("Registrar Inc."));
        assert_eq!(record.status.as_deref(), Some("clientTransferProhibited"));
        assert_eq!(record.name_servers.len(), 2);
        assert_eq!(record.referral.as_deref(), Some("whois.pir.org"));
    }

    #[test]
    fn test_whodat_shape() {
        let payload = json!({
            "domain": {
                "domain": "example.net",
                "created_date": "2000-01-01T00:00:00Z",
                "expiration_date": 1893456000,
                "name_servers": "ns1.example.net, ns2.example.net",
                "status": ["ok"]
            },
            "registrar": {"name": "Who Registrar"},
            "registrant": {"name": "Jane Doe"}
        });

        let record = adapt(AggregatorKind::WhoDat, &payload, "example.net");
        assert_eq!(record.registrar.as_deref(), Some("Who Registrar"));
        assert_eq!(record.expiry_date.as_deref(), Some("1893456000"));
        assert_eq!(record.registrant.as_deref(), Some("Jane Doe"));
        assert_eq!(record.name_servers, vec!["ns1.example.net", "ns2.example.net"]);
    }

    #[test]
    fn test_generic_key_synonyms() {
        let payload = json!({
            "registrar": "Generic Registrar",
            "date_created": "2010-10-10",
            "expiration_date": "2030-10-10",
            "nameservers": [{"name": "dns1.example.io"}, {"ldhName": "dns2.example.io"}],
            "whoisServer": "whois.nic.io"
        });

        let record = adapt(AggregatorKind::Generic, &payload, "example.io");
        assert_eq!(record.creation_date.as_deref(), Some("2010-10-10"));
        assert_eq!(record.expiry_date.as_deref(), Some("2030-10-10"));
        assert_eq!(record.name_servers, vec!["dns1.example.io", "dns2.example.io"]);
        assert_eq!(record.referral.as_deref(), Some("whois.nic.io"));
    }

    #[test]
    fn test_shape_mismatch_keeps_raw() {
        let payload = json!(["unexpected", {"registrar": true}]);
        for kind in [
            AggregatorKind::WhoisXml,
            AggregatorKind::WhoisFreaks,
            AggregatorKind::WhoDat,
            AggregatorKind::Generic,
        ] {
            let record = adapt(kind, &payload, "example.com");
            assert!(record.core_missing);
            assert!(!record.has_data());
            assert_eq!(record.raw, payload.to_string());
        }
    }
}
