//! WHOIS text into a [`PartialRecord`].
//!
//! WHOIS has no schema. Parsing runs in passes, each only filling fields
//! the previous ones left unset:
//!
//! 1. a registry grammar for families with non-conforming layouts
//!    (Nominet blocks, JPRS bracketed labels, DENIC, CNNIC)
//! 2. a line scan against label synonym tables
//! 3. whole-text regexes that also cover bilingual labels
//! 4. a bare date scan, as a last resort against all-unknown results

use crate::protocols::tld::registry_suffix;
use crate::types::{fill, PartialRecord};
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Registrar,
    Created,
    Expires,
    Status,
    Registrant,
    NameServer,
    Referral,
}

/// Label synonyms, compared against the lower-cased text before the first
/// colon.
const LABELS: &[(Field, &[&str])] = &[
    (
        Field::Registrar,
        &[
            "registrar",
            "registrar name",
            "sponsoring registrar",
            "registrar organization",
            "registrar organisation",
            "registration service provider",
        ],
    ),
    (
        Field::Created,
        &[
            "creation date",
            "created",
            "created on",
            "created date",
            "created at",
            "registered",
            "registered on",
            "registration date",
            "registration time",
            "domain registration date",
            "domain record activated",
            "record created",
        ],
    ),
    (
        Field::Expires,
        &[
            "registry expiry date",
            "registrar registration expiration date",
            "expiry date",
            "expiration date",
            "expiration time",
            "expire date",
            "expires",
            "expires on",
            "paid-till",
            "renewal date",
            "domain expiration date",
            "record expires on",
            "valid until",
        ],
    ),
    (Field::Status, &["domain status", "status", "state"]),
    (
        Field::Registrant,
        &[
            "registrant",
            "registrant name",
            "registrant organization",
            "registrant organisation",
            "holder",
            "org",
        ],
    ),
    (
        Field::NameServer,
        &[
            "name server",
            "name servers",
            "nameserver",
            "nameservers",
            "nserver",
            "dns",
        ],
    ),
    (
        Field::Referral,
        &["whois server", "registrar whois server", "refer", "whois"],
    ),
];

/// Phrases registries use for an unregistered name.
const NOT_FOUND_PHRASES: &[&str] = &[
    "no match for",
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "domain not found",
    "domain available",
    "status: available",
    "status: free",
    "no information available",
    "not registered",
    "no matching record",
    "domain status: no object found",
    "the queried object does not exist",
    "object does not exist",
    "no matching entry",
    "domain name not found",
    "this domain name has not been registered",
    "no found",
];

/// Layout overrides for one registry family.
struct Grammar {
    family: &'static str,
    registrar: Option<Regex>,
    created: Option<Regex>,
    expires: Option<Regex>,
    registrant: Option<Regex>,
    status: Option<Regex>,
    /// One capture per name server line
    name_server: Option<Regex>,
    /// One capture holding a block of name servers, one per line
    name_server_block: Option<Regex>,
    /// Whether the bare date scan may run; off where the only dates are
    /// change stamps
    date_scan: bool,
}

fn re(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

lazy_static! {
    static ref GRAMMARS: Vec<Grammar> = vec![
        Grammar {
            family: "uk",
            registrar: re(r"(?m)^\s*Registrar:\s*\n\s*([^\n\[]+)"),
            created: re(r"(?mi)^\s*Registered on:\s*(.+)$"),
            expires: re(r"(?mi)^\s*Expiry date:\s*(.+)$"),
            registrant: re(r"(?m)^\s*Registrant:\s*\n\s*([^\n]+)"),
            status: re(r"(?m)^\s*Registration status:\s*\n\s*([^\n]+)"),
            name_server: None,
            name_server_block: re(r"(?ms)^\s*Name servers:\s*\n(.*?)(?:\n\s*\n|\z)"),
            date_scan: true,
        },
        Grammar {
            family: "jp",
            registrar: None,
            created: re(r"(?m)^\[(?:Created on|登録年月日)\]\s*(.+)$"),
            expires: re(r"(?m)^\[(?:Expires on|有効期限)\]\s*(.+)$"),
            registrant: re(r"(?m)^\[(?:Registrant|登録者名|Organization|組織名)\]\s*(.+)$"),
            status: re(r"(?m)^\[(?:Status|状態)\]\s*(.+)$"),
            name_server: re(r"(?m)^\[(?:Name Server|ネームサーバ)\]\s*(\S+)"),
            name_server_block: None,
            date_scan: true,
        },
        Grammar {
            family: "de",
            registrar: None,
            created: None,
            expires: None,
            registrant: None,
            status: re(r"(?mi)^Status:\s*(.+)$"),
            name_server: re(r"(?mi)^Nserver:\s*(\S+)"),
            name_server_block: None,
            date_scan: false,
        },
        Grammar {
            family: "cn",
            registrar: re(r"(?mi)^Sponsoring Registrar:\s*(.+)$"),
            created: re(r"(?mi)^Registration Time:\s*(.+)$"),
            expires: re(r"(?mi)^Expiration Time:\s*(.+)$"),
            registrant: re(r"(?mi)^Registrant:\s*(.+)$"),
            status: re(r"(?mi)^Domain Status:\s*(.+)$"),
            name_server: re(r"(?mi)^Name Server:\s*(\S+)"),
            name_server_block: None,
            date_scan: true,
        },
    ];

    static ref BROAD_REGISTRAR: Option<Regex> = re(
        r"(?mi)(?:registrar name|sponsoring registrar|registrar|注册商|注册服务机构|登録業者)\s*[:：\]]\s*(.+)$"
    );
    static ref BROAD_CREATED: Option<Regex> = re(
        r"(?mi)(?:creation date|created(?: on| date)?|registered(?: on)?|registration (?:date|time)|注册时间|注册日期|登録年月日)\s*[:：\]]\s*(.+)$"
    );
    static ref BROAD_EXPIRES: Option<Regex> = re(
        r"(?mi)(?:expir\w*(?: date| time| on)?|paid-till|renewal date|到期时间|过期时间|有効期限)\s*[:：\]]\s*(.+)$"
    );
    static ref BROAD_REGISTRANT: Option<Regex> = re(
        r"(?mi)(?:registrant(?: name| organi[sz]ation)?|注册人|所有者|登録者名)\s*[:：\]]\s*(.+)$"
    );
    static ref BROAD_STATUS: Option<Regex> = re(
        r"(?mi)(?:domain status|status|状态|状態)\s*[:：\]]\s*(.+)$"
    );

    static ref DATE: Option<Regex> = re(
        // ISO timestamps glue the time on with a bare `T`
        r"\b(\d{1,4}[-./]\d{1,2}[-./]\d{1,4}|\d{1,2}-[A-Za-z]{3}-\d{4})(?:\b|T)"
    );
}

/// Parse a WHOIS response for `domain`.
pub fn parse(raw: &str, domain: &str) -> PartialRecord {
    let text = raw.replace("\r\n", "\n");
    let mut record = PartialRecord::with_raw(raw);

    let grammar = registry_suffix(domain)
        .and_then(|s| s.rsplit('.').next().map(str::to_string))
        .and_then(|family| GRAMMARS.iter().find(|g| g.family == family));

    if let Some(grammar) = grammar {
        apply_grammar(grammar, &text, &mut record);
    }

    scan_lines(&text, &mut record);
    broad_pass(&text, &mut record);

    let date_scan = grammar.map(|g| g.date_scan).unwrap_or(true);
    if date_scan && !is_not_found(&text) {
        scan_dates(&text, &mut record);
    }

    let record = record.finish();
    tracing::debug!(
        domain,
        grammar = grammar.map(|g| g.family).unwrap_or("generic"),
        core_missing = record.core_missing,
        name_servers = record.name_servers.len(),
        "Parsed WHOIS response"
    );
    record
}

/// Whether the text is a registry's "no such domain" answer.
pub fn is_not_found(text: &str) -> bool {
    let lower = text.to_lowercase();
    NOT_FOUND_PHRASES.iter().any(|p| lower.contains(p))
}

fn apply_grammar(grammar: &Grammar, text: &str, record: &mut PartialRecord) {
    let first = |regex: &Option<Regex>| first_capture(regex, text);

    if let Some(v) = first(&grammar.registrar) {
        fill(&mut record.registrar, &v);
    }
    if let Some(v) = first(&grammar.created) {
        fill(&mut record.creation_date, &v);
    }
    if let Some(v) = first(&grammar.expires) {
        fill(&mut record.expiry_date, &v);
    }
    if let Some(v) = first(&grammar.registrant) {
        fill(&mut record.registrant, &v);
    }
    if let Some(v) = first(&grammar.status) {
        fill(&mut record.status, &v);
    }

    if let Some(regex) = &grammar.name_server {
        for caps in regex.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                record.push_name_server(m.as_str());
            }
        }
    }

    if let Some(regex) = &grammar.name_server_block {
        if let Some(block) = regex.captures(text).and_then(|c| c.get(1)) {
            for line in block.as_str().lines() {
                record.push_name_server(line.trim());
            }
        }
    }
}

fn classify_label(label: &str) -> Option<Field> {
    LABELS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&label))
        .map(|(field, _)| *field)
}

fn scan_lines(text: &str, record: &mut PartialRecord) {
    // Set after a "Name servers:" line with nothing after the colon; the
    // following indented lines carry the hosts until a blank line
    let mut in_ns_block = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            in_ns_block = false;
            continue;
        }
        if trimmed.starts_with('%') || trimmed.starts_with('#') {
            continue;
        }

        let Some((label, value)) = trimmed.split_once(':') else {
            if in_ns_block {
                record.push_name_server(trimmed);
            }
            continue;
        };

        let label = label.trim().to_lowercase();
        let value = value.trim();
        in_ns_block = false;

        let Some(field) = classify_label(&label) else {
            continue;
        };

        match field {
            Field::Registrar => fill(&mut record.registrar, value),
            Field::Created => fill(&mut record.creation_date, value),
            Field::Expires => fill(&mut record.expiry_date, value),
            Field::Registrant => fill(&mut record.registrant, value),
            Field::Status => fill(&mut record.status, strip_status_url(value)),
            Field::NameServer => {
                if value.is_empty() {
                    in_ns_block = true;
                } else {
                    record.push_name_server(value);
                }
            }
            Field::Referral => {
                if record.referral.is_none() {
                    record.referral = referral_host(value);
                }
            }
        }
    }
}

/// Drop the ICANN explanation link gTLD registries append to status codes.
fn strip_status_url(value: &str) -> &str {
    match value.find(" http") {
        Some(idx) => value[..idx].trim(),
        None => value,
    }
}

fn referral_host(value: &str) -> Option<String> {
    let host = value.split_whitespace().next()?;
    let host = host
        .trim_start_matches("whois://")
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_lowercase();

    host.contains('.').then_some(host)
}

fn first_capture(regex: &Option<Regex>, text: &str) -> Option<String> {
    regex
        .as_ref()?
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .find(|v| !v.is_empty())
}

fn broad_pass(text: &str, record: &mut PartialRecord) {
    let passes: [(&Option<Regex>, &mut Option<String>); 5] = [
        (&*BROAD_REGISTRAR, &mut record.registrar),
        (&*BROAD_CREATED, &mut record.creation_date),
        (&*BROAD_EXPIRES, &mut record.expiry_date),
        (&*BROAD_REGISTRANT, &mut record.registrant),
        (&*BROAD_STATUS, &mut record.status),
    ];

    for (regex, slot) in passes {
        if slot.is_none() {
            if let Some(value) = first_capture(regex, text) {
                fill(slot, &value);
            }
        }
    }
}

/// Assign the first two distinct date-looking tokens to creation and
/// expiry, only when neither was found by label.
fn scan_dates(text: &str, record: &mut PartialRecord) {
    if record.creation_date.is_some() || record.expiry_date.is_some() {
        return;
    }

    let Some(date) = DATE.as_ref() else {
        return;
    };

    let mut found: Vec<&str> = Vec::new();
    for candidate in date.captures_iter(text).filter_map(|c| c.get(1)) {
        let candidate = candidate.as_str();
        // IP fragments such as 168.1.1 match the shape but carry no year
        let has_year = candidate
            .split(|c| c == '-' || c == '.' || c == '/')
            .any(|part| part.len() == 4);
        if has_year && !found.contains(&candidate) {
            found.push(candidate);
            if found.len() == 2 {
                break;
            }
        }
    }

    if let Some(created) = found.first() {
        fill(&mut record.creation_date, created);
    }
    if let Some(expires) = found.get(1) {
        fill(&mut record.expiry_date, expires);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN_COM: &str = "   Domain Name: GOOGLE.COM\r\n\
   Registry Domain ID: 2138514_DOMAIN_COM-VRSN\r\n\
   Registrar WHOIS Server: whois.markmonitor.com\r\n\
   Registrar URL: http://www.markmonitor.com\r\n\
   Updated Date: 2019-09-09T15:39:04Z\r\n\
   Creation Date: 1997-09-15T04:00:00Z\r\n\
   Registry Expiry Date: 2028-09-14T04:00:00Z\r\n\
   Registrar: MarkMonitor Inc.\r\n\
   Registrar IANA ID: 292\r\n\
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r\n\
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r\n\
   Name Server: NS1.GOOGLE.COM\r\n\
   Name Server: NS2.GOOGLE.COM\r\n\
   Name Server: NS1.GOOGLE.COM\r\n\
>>> Last update of whois database: 2026-10-19T08:00:00Z <<<\r\n";

    #[test]
    fn test_parse_verisign_response() {
        let record = parse(VERISIGN_COM, "google.com");

        assert_eq!(record.registrar.as_deref(), Some("MarkMonitor Inc."));
        assert_eq!(record.creation_date.as_deref(), Some("1997-09-15T04:00:00Z"));
        assert_eq!(record.expiry_date.as_deref(), Some("2028-09-14T04:00:00Z"));
        assert_eq!(record.status.as_deref(), Some("clientDeleteProhibited"));
        assert_eq!(record.name_servers, vec!["ns1.google.com", "ns2.google.com"]);
        assert_eq!(record.referral.as_deref(), Some("whois.markmonitor.com"));
        assert_eq!(record.raw, VERISIGN_COM);
        assert!(!record.core_missing);
    }

    #[test]
    fn test_parse_nominet_blocks() {
        let text = "\n    Domain name:\n        example.co.uk\n\n\
    Registrar:\n        Nominet UK [Tag = NOMINET]\n        URL: https://nominet.uk\n\n\
    Relevant dates:\n        Registered on: 26-Nov-1996\n        Expiry date:  26-Nov-2027\n        Last updated:  10-Oct-2025\n\n\
    Registration status:\n        Registered until expiry date.\n\n\
    Name servers:\n        ns1.example.co.uk   192.0.2.1\n        ns2.example.co.uk\n\n";

        let record = parse(text, "example.co.uk");
        assert_eq!(record.registrar.as_deref(), Some("Nominet UK"));
        assert_eq!(record.creation_date.as_deref(), Some("26-Nov-1996"));
        assert_eq!(record.expiry_date.as_deref(), Some("26-Nov-2027"));
        assert_eq!(record.status.as_deref(), Some("Registered until expiry date."));
        assert_eq!(record.name_servers, vec!["ns1.example.co.uk", "ns2.example.co.uk"]);
    }

    #[test]
    fn test_parse_jprs_brackets() {
        let text = "[ JPRS database provides information on network administration. ]\n\
[Domain Name]                   EXAMPLE.CO.JP\n\
[Registrant]                    Example K.K.\n\
[Name Server]                   ns1.example.jp\n\
[Name Server]                   ns2.example.jp\n\
[Created on]                    2001/03/22\n\
[Expires on]                    2027/03/31\n\
[Status]                        Active\n";

        let record = parse(text, "example.co.jp");
        assert_eq!(record.registrant.as_deref(), Some("Example K.K."));
        assert_eq!(record.creation_date.as_deref(), Some("2001/03/22"));
        assert_eq!(record.expiry_date.as_deref(), Some("2027/03/31"));
        assert_eq!(record.status.as_deref(), Some("Active"));
        assert_eq!(record.name_servers, vec!["ns1.example.jp", "ns2.example.jp"]);
    }

    #[test]
    fn test_parse_denic_skips_date_scan() {
        let text = "Domain: example.de\nNserver: ns1.example.net\nNserver: ns2.example.net\nStatus: connect\nChanged: 2018-03-12T21:44:25+01:00\n";

        let record = parse(text, "example.de");
        assert_eq!(record.status.as_deref(), Some("connect"));
        assert_eq!(record.name_servers.len(), 2);
        assert!(record.creation_date.is_none());
        assert!(record.core_missing);
    }

    #[test]
    fn test_parse_cnnic_bilingual() {
        let text = "Domain Name: example.cn\nDomain Status: ok\nRegistrant: 示例科技有限公司\nSponsoring Registrar: 北京新网数码信息技术有限公司\nName Server: dns1.example.cn\nRegistration Time: 2003-03-17 12:20:05\nExpiration Time: 2029-03-17 12:48:36\n";

        let record = parse(text, "example.cn");
        assert_eq!(record.registrar.as_deref(), Some("北京新网数码信息技术有限公司"));
        assert_eq!(record.creation_date.as_deref(), Some("2003-03-17 12:20:05"));
        assert_eq!(record.expiry_date.as_deref(), Some("2029-03-17 12:48:36"));
        assert_eq!(record.registrant.as_deref(), Some("示例科技有限公司"));
    }

    #[test]
    fn test_broad_pass_catches_full_width_colon() {
        let text = "域名：example.com.cn\n注册商：阿里云计算有限公司\n注册时间：2010-01-01\n到期时间：2030-01-01\n";
        let record = parse(text, "example.com.cn");

        assert_eq!(record.registrar.as_deref(), Some("阿里云计算有限公司"));
        assert_eq!(record.creation_date.as_deref(), Some("2010-01-01"));
        assert_eq!(record.expiry_date.as_deref(), Some("2030-01-01"));
    }

    #[test]
    fn test_date_scan_last_resort() {
        let text = "Domain: example.xyz\nfirst seen 2001-05-06 ... valid through 2031-05-06, host 10.168.1.1\n";
        let record = parse(text, "example.xyz");

        assert_eq!(record.creation_date.as_deref(), Some("2001-05-06"));
        assert_eq!(record.expiry_date.as_deref(), Some("2031-05-06"));
    }

    #[test]
    fn test_date_scan_reads_iso_timestamps() {
        let text = "Domain: example.xyz\nfirst seen 2001-05-06T00:00:00Z ... valid through 2031-05-06T00:00:00Z\n";
        let record = parse(text, "example.xyz");

        assert_eq!(record.creation_date.as_deref(), Some("2001-05-06"));
        assert_eq!(record.expiry_date.as_deref(), Some("2031-05-06"));
    }

    #[test]
    fn test_labels_match_whole_names_only() {
        // "Registrar URL" and "Registrar IANA ID" share a prefix with
        // "Registrar" but must not fill it
        let text = "Domain Name: EXAMPLE.NET\n\
Registrar URL: http://www.registrar.example\n\
Registrar IANA ID: 9999\n\
Registrar Abuse Contact Email: abuse@registrar.example\n\
Registrar: Real Registrar Ltd\n";
        let record = parse(text, "example.net");

        assert_eq!(record.registrar.as_deref(), Some("Real Registrar Ltd"));
    }

    #[test]
    fn test_not_found_response() {
        let text = "No match for \"THISDOMAINSHOULDNOTEXIST-XYZABC123.COM\".\r\n\
>>> Last update of whois database: 2026-10-19T08:00:00Z <<<\r\n";

        assert!(is_not_found(text));
        let record = parse(text, "thisdomainshouldnotexist-xyzabc123.com");
        assert!(record.creation_date.is_none());
        assert!(record.core_missing);
    }

    #[test]
    fn test_referral_only_response() {
        let text = "domain: COM\nrefer: whois.verisign-grs.com\nwhois server: other.example\n";
        let record = parse(text, "example.com");
        assert_eq!(record.referral.as_deref(), Some("whois.verisign-grs.com"));
    }

    #[test]
    fn test_empty_input() {
        let record = parse("", "example.com");
        assert!(record.core_missing);
        assert!(record.name_servers.is_empty());
        assert!(!is_not_found(""));
    }
}
