//! Text-mode display logic for domain-lookup CLI.
//!
//! This module handles all non-JSON output: colored record blocks,
//! progress counters, headers and summaries. Uses only the `console` crate.

use console::{pad_str, style, Alignment};
use domain_lookup_lib::{NormalizedRecord, RegistrationState, SourceProtocol};
use std::time::Duration;

const LABEL_WIDTH: usize = 12;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a multi-domain run.
pub fn print_header(domain_count: usize, concurrency: usize) {
    println!(
        "{} {} {}",
        style("domain-lookup").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Looking up {} domain{} (concurrency {})",
            domain_count,
            if domain_count == 1 { "" } else { "s" },
            concurrency
        ))
        .dim(),
    );
    println!();
}

// ── Single record ────────────────────────────────────────────────────────────

/// Print one record as an aligned block.
///
/// If `counter` is Some((current, total)), a progress prefix like `[3/8]` is shown.
pub fn print_record(record: &NormalizedRecord, show_raw: bool, counter: Option<(usize, usize)>) {
    let prefix = match counter {
        Some((cur, total)) => format!("{} ", style(format!("[{}/{}]", cur, total)).dim()),
        None => String::new(),
    };

    println!(
        "{}{}  {}  {}",
        prefix,
        style(&record.domain).white().bold(),
        registration_label(record.registration),
        style(format!("via {}", source_label(record))).dim(),
    );

    for (label, value) in record_fields(record) {
        println!(
            "  {} {}",
            style(pad_str(label, LABEL_WIDTH, Alignment::Left, None)).dim(),
            value
        );
    }

    if let Some(message) = &record.message {
        println!("  {} {}", style("note:").yellow(), message);
    }

    if record.needs_follow_up {
        if let Some(referral) = &record.referral_server {
            println!(
                "  {} {}",
                style("└─").dim(),
                style(format!("more detail: --server {}", referral)).cyan(),
            );
        }
    }

    if show_raw {
        println!("  {}", style("── raw ──").dim());
        for line in record.raw_data.lines() {
            println!("  {}", line);
        }
    }

    println!();
}

fn registration_label(state: RegistrationState) -> String {
    match state {
        RegistrationState::Registered => style("REGISTERED").red().bold().to_string(),
        RegistrationState::Available => style("AVAILABLE").green().bold().to_string(),
        RegistrationState::Indeterminate => style("UNKNOWN").yellow().to_string(),
    }
}

/// "RDAP rdap.verisign.com", "WHOIS whois.nic.uk", "ERROR".
pub fn source_label(record: &NormalizedRecord) -> String {
    match (&record.source_protocol, &record.source_host) {
        (SourceProtocol::Error, _) | (_, None) => record.source_protocol.to_string(),
        (protocol, Some(host)) => format!("{} {}", protocol, host),
    }
}

/// Known fields as (label, value) pairs; unknown fields are left out.
pub fn record_fields(record: &NormalizedRecord) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();

    for (label, value) in [
        ("Registrar", &record.registrar),
        ("Registrant", &record.registrant),
        ("Created", &record.registration_date),
        ("Expires", &record.expiry_date),
        ("Status", &record.status),
    ] {
        if NormalizedRecord::is_known(value) {
            fields.push((label, value.clone()));
        }
    }

    if !record.name_servers.is_empty() {
        fields.push(("Nameservers", record.name_servers.join(", ")));
    }

    fields
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Running tally of registration states.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counts {
    pub registered: usize,
    pub available: usize,
    pub unknown: usize,
}

impl Counts {
    pub fn add(&mut self, record: &NormalizedRecord) {
        match record.registration {
            RegistrationState::Registered => self.registered += 1,
            RegistrationState::Available => self.available += 1,
            RegistrationState::Indeterminate => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.registered + self.available + self.unknown
    }
}

/// Print the final summary bar with colored counts.
pub fn print_summary(counts: &Counts, duration: Duration) {
    let total = counts.total();
    println!(
        "{}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "{} domain{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} registered", counts.registered)).red(),
        style("|").dim(),
        style(format!("{} available", counts.available)).green(),
        style("|").dim(),
        style(format!("{} unknown", counts.unknown)).yellow(),
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use domain_lookup_lib::UNKNOWN;

    fn make_record(protocol: SourceProtocol, registration: RegistrationState) -> NormalizedRecord {
        NormalizedRecord {
            domain: "example.com".to_string(),
            source_protocol: protocol,
            source_host: Some("whois.verisign-grs.com".to_string()),
            registrar: "Example Registrar".to_string(),
            registration_date: "1995-08-14".to_string(),
            expiry_date: UNKNOWN.to_string(),
            name_servers: vec!["a.iana-servers.net".to_string()],
            registrant: UNKNOWN.to_string(),
            status: UNKNOWN.to_string(),
            raw_data: "raw".to_string(),
            message: None,
            needs_follow_up: false,
            referral_server: None,
            registration,
        }
    }

    #[test]
    fn test_record_fields_skip_unknown() {
        let record = make_record(SourceProtocol::Whois, RegistrationState::Registered);
        let labels: Vec<&str> = record_fields(&record).iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Registrar", "Created", "Nameservers"]);
    }

    #[test]
    fn test_source_label() {
        let record = make_record(SourceProtocol::Whois, RegistrationState::Registered);
        assert_eq!(source_label(&record), "WHOIS whois.verisign-grs.com");

        let failed = NormalizedRecord {
            source_host: None,
            ..make_record(SourceProtocol::Error, RegistrationState::Indeterminate)
        };
        assert_eq!(source_label(&failed), "ERROR");
    }

    #[test]
    fn test_counts() {
        let mut counts = Counts::default();
        counts.add(&make_record(SourceProtocol::Rdap, RegistrationState::Registered));
        counts.add(&make_record(SourceProtocol::Whois, RegistrationState::Available));
        counts.add(&make_record(SourceProtocol::Error, RegistrationState::Indeterminate));
        counts.add(&make_record(SourceProtocol::Rdap, RegistrationState::Registered));

        assert_eq!(counts.registered, 2);
        assert_eq!(counts.available, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.total(), 4);
    }
}
