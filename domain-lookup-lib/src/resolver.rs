//! Resolution orchestrator.
//!
//! [`DomainResolver`] runs one lookup as a small state machine:
//!
//! ```text
//! START -> POPULAR_LOOKUP -> RDAP_ATTEMPT -> WHOIS_ATTEMPT
//!       -> AGGREGATOR_ATTEMPT -> STATIC_FALLBACK -> DONE
//! ```
//!
//! Each stage either finishes the lookup or hands over to the next one.
//! Every stage is awaited against a single deadline, so a lookup always
//! ends in a [`NormalizedRecord`] within the overall timeout, whatever the
//! individual sources do.

use crate::error::LookupError;
use crate::fallback::StaticTable;
use crate::parsers::{is_not_found, rdap_json, whois_text};
use crate::protocols::{
    AggregatorClient, BootstrapCache, HttpClient, RdapClient, ReqwestHttpClient, TcpLineClient,
    TldTable, TokioTcpClient, WhoisClient,
};
use crate::types::{
    LookupConfig, NormalizedRecord, PartialRecord, Protocol, RegistrationState, ResolveOptions,
    SourceProtocol, UNKNOWN,
};
use crate::utils::{normalize_domain, validate_domain};
use futures_util::stream::{self, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// `source_host` reported for data from the built-in table.
const STATIC_HOST: &str = "built-in";

/// Upper bound on one lookup's overall budget.
pub(crate) const MAX_OVERALL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PopularLookup,
    Rdap,
    Whois,
    Aggregator,
    StaticFallback,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::PopularLookup => "popular_lookup",
            Stage::Rdap => "rdap",
            Stage::Whois => "whois",
            Stage::Aggregator => "aggregator",
            Stage::StaticFallback => "static_fallback",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// How one attempt against one source ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Empty,
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    pub source: String,
    pub outcome: Outcome,
    pub detail: String,
}

/// Ordered record of every source a lookup touched.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttemptLog {
    entries: Vec<Attempt>,
}

impl AttemptLog {
    fn push<S: Into<String>, D: Into<String>>(&mut self, source: S, outcome: Outcome, detail: D) {
        let attempt = Attempt {
            source: source.into(),
            outcome,
            detail: detail.into(),
        };
        tracing::debug!(
            source = %attempt.source,
            outcome = ?attempt.outcome,
            detail = %attempt.detail,
            "Lookup attempt"
        );
        self.entries.push(attempt);
    }

    pub fn entries(&self) -> &[Attempt] {
        &self.entries
    }

    /// Hosts whose WHOIS exchange was attempted, in order.
    fn whois_hosts(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|a| a.source.strip_prefix("whois:"))
            .collect()
    }

    /// Human-readable diagnostic, one line per attempt.
    fn render(&self, domain: &str) -> String {
        let mut out = format!("Resolution failed for '{}'\n", domain);
        if self.entries.is_empty() {
            out.push_str("  no source was attempted\n");
        }
        for attempt in &self.entries {
            let tag = match attempt.outcome {
                Outcome::Success => "OK",
                Outcome::Empty => "EMPTY",
                Outcome::Error => "ERROR",
            };
            out.push_str(&format!("  [{}] {}: {}\n", tag, attempt.source, attempt.detail));
        }
        out
    }
}

/// Private, mutable copy of the result while the state machine runs.
#[derive(Debug)]
struct WorkingRecord {
    domain: String,
    source_protocol: Option<SourceProtocol>,
    source_host: Option<String>,
    registrar: Option<String>,
    creation_date: Option<String>,
    expiry_date: Option<String>,
    registrant: Option<String>,
    status: Option<String>,
    name_servers: Vec<String>,
    raw: String,
    notes: Vec<String>,
    needs_follow_up: bool,
    referral_server: Option<String>,
    available: bool,
}

impl WorkingRecord {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            source_protocol: None,
            source_host: None,
            registrar: None,
            creation_date: None,
            expiry_date: None,
            registrant: None,
            status: None,
            name_servers: Vec::new(),
            raw: String::new(),
            notes: Vec::new(),
            needs_follow_up: false,
            referral_server: None,
            available: false,
        }
    }

    /// Later known values overwrite earlier ones; an empty name server list
    /// keeps the earlier list.
    fn merge(&mut self, partial: PartialRecord, protocol: SourceProtocol, host: &str) {
        let PartialRecord {
            registrar,
            creation_date,
            expiry_date,
            registrant,
            status,
            name_servers,
            raw,
            ..
        } = partial;

        for (slot, value) in [
            (&mut self.registrar, registrar),
            (&mut self.creation_date, creation_date),
            (&mut self.expiry_date, expiry_date),
            (&mut self.registrant, registrant),
            (&mut self.status, status),
        ] {
            if value.is_some() {
                *slot = value;
            }
        }

        if !name_servers.is_empty() {
            self.name_servers = name_servers;
        }
        if !raw.trim().is_empty() {
            self.raw = raw;
        }

        self.source_protocol = Some(protocol);
        self.source_host = Some(host.to_string());
    }

    /// Drop everything a previous stage contributed.
    fn clear_data(&mut self) {
        self.registrar = None;
        self.creation_date = None;
        self.expiry_date = None;
        self.registrant = None;
        self.status = None;
        self.name_servers.clear();
    }

    fn contributed(&self) -> bool {
        self.source_protocol.is_some()
    }

    fn is_static(&self) -> bool {
        self.source_protocol == Some(SourceProtocol::Static)
    }

    fn note<S: Into<String>>(&mut self, note: S) {
        self.notes.push(note.into());
    }

    fn freeze(self, log: &AttemptLog) -> NormalizedRecord {
        let Some(source_protocol) = self.source_protocol else {
            let message = self.notes.join("; ");
            return error_record(&self.domain, log.render(&self.domain), Some(message));
        };

        let known = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        let raw_data = if self.raw.trim().is_empty() {
            log.render(&self.domain)
        } else {
            self.raw
        };

        let mut record = NormalizedRecord {
            domain: self.domain,
            source_protocol,
            source_host: self.source_host,
            registrar: known(self.registrar),
            registration_date: known(self.creation_date),
            expiry_date: known(self.expiry_date),
            name_servers: self.name_servers,
            registrant: known(self.registrant),
            status: known(self.status),
            raw_data,
            message: (!self.notes.is_empty()).then(|| self.notes.join("; ")),
            needs_follow_up: self.needs_follow_up,
            referral_server: self.referral_server,
            registration: RegistrationState::Indeterminate,
        };

        record.registration = if self.available {
            RegistrationState::Available
        } else {
            classify(&record)
        };
        record
    }
}

/// Record returned when no source produced anything.
pub(crate) fn error_record(domain: &str, diagnostic: String, message: Option<String>) -> NormalizedRecord {
    NormalizedRecord {
        domain: domain.to_string(),
        source_protocol: SourceProtocol::Error,
        source_host: None,
        registrar: UNKNOWN.to_string(),
        registration_date: UNKNOWN.to_string(),
        expiry_date: UNKNOWN.to_string(),
        name_servers: Vec::new(),
        registrant: UNKNOWN.to_string(),
        status: UNKNOWN.to_string(),
        raw_data: if diagnostic.trim().is_empty() {
            format!("Resolution failed for '{}'", domain)
        } else {
            diagnostic
        },
        message: message.filter(|m| !m.is_empty()),
        needs_follow_up: false,
        referral_server: None,
        registration: RegistrationState::Indeterminate,
    }
}

/// Derive the registration state of a finished record.
///
/// Registered when RDAP supplied the data or when at least two of
/// registrar, a date and name servers are known. Available when the raw
/// payload is a registry's not-found answer. Indeterminate otherwise.
pub fn classify(record: &NormalizedRecord) -> RegistrationState {
    if record.source_protocol == SourceProtocol::Rdap {
        return RegistrationState::Registered;
    }

    let signals = [
        NormalizedRecord::is_known(&record.registrar),
        NormalizedRecord::is_known(&record.registration_date)
            || NormalizedRecord::is_known(&record.expiry_date),
        !record.name_servers.is_empty(),
    ]
    .iter()
    .filter(|s| **s)
    .count();

    if signals >= 2 {
        return RegistrationState::Registered;
    }

    let live = !matches!(
        record.source_protocol,
        SourceProtocol::Static | SourceProtocol::Error
    );
    if live && is_not_found(&record.raw_data) {
        return RegistrationState::Available;
    }

    RegistrationState::Indeterminate
}

/// The last valid WHOIS answer seen in a stage.
struct WhoisAnswer {
    host: String,
    record: PartialRecord,
    not_found: bool,
    referral: Option<String>,
}

/// Signals that the overall deadline passed inside a stage.
struct DeadlinePassed;

/// Multi-source registration lookup.
///
/// Owns its transports, server tables and the RDAP bootstrap cache; nothing
/// is shared between resolver instances. Cloning is cheap and clones share
/// the bootstrap cache.
///
/// # Example
///
/// ```rust,no_run
/// use domain_lookup_lib::{DomainResolver, ResolveOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = DomainResolver::new()?;
///     let record = resolver.resolve("example.com", &ResolveOptions::default()).await;
///     println!("{} via {}: {}", record.domain, record.source_protocol, record.registrar);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainResolver {
    config: LookupConfig,
    tld_table: TldTable,
    static_table: StaticTable,
    whois: WhoisClient,
    rdap: RdapClient,
    aggregators: AggregatorClient,
}

impl DomainResolver {
    /// Resolver with default configuration and the tokio/reqwest transports.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_config(LookupConfig::default())
    }

    pub fn with_config(config: LookupConfig) -> Result<Self, LookupError> {
        let http = Arc::new(ReqwestHttpClient::new()?);
        Ok(Self::with_transports(config, Arc::new(TokioTcpClient), http))
    }

    /// Resolver over caller-supplied transports.
    pub fn with_transports(
        config: LookupConfig,
        tcp: Arc<dyn TcpLineClient>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let bootstrap = Arc::new(BootstrapCache::new());
        let use_bootstrap = config.enable_bootstrap && cfg!(feature = "bootstrap");

        Self {
            tld_table: TldTable::with_overrides(&config.server_overrides),
            static_table: StaticTable::builtin(),
            whois: WhoisClient::new(tcp, config.whois_timeout),
            rdap: RdapClient::new(
                http.clone(),
                bootstrap,
                config.rdap_timeout,
                use_bootstrap,
                config.rdap_mirrors.clone(),
            ),
            aggregators: AggregatorClient::new(
                http,
                config.aggregators.clone(),
                config.aggregator_timeout,
            ),
            config,
        }
    }

    /// Replace the built-in well-known domain table.
    pub fn with_static_table(mut self, table: StaticTable) -> Self {
        self.static_table = table;
        self
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Resolve registration data for one domain.
    ///
    /// Never fails: unreachable sources, unparseable payloads and invalid
    /// input all end in a record, at worst one with
    /// [`SourceProtocol::Error`] and a diagnostic in `raw_data`.
    pub async fn resolve(&self, domain: &str, options: &ResolveOptions) -> NormalizedRecord {
        self.resolve_with_log(domain, options).await.0
    }

    /// Resolve several domains, yielding records as they complete.
    ///
    /// At most `config.concurrency` lookups run at once.
    pub fn resolve_stream<'a>(
        &'a self,
        domains: Vec<String>,
        options: &'a ResolveOptions,
    ) -> impl Stream<Item = NormalizedRecord> + 'a {
        stream::iter(domains)
            .map(move |domain| async move { self.resolve(&domain, options).await })
            .buffer_unordered(self.config.concurrency.max(1))
    }

    /// Resolve several domains, returning records in input order.
    pub async fn resolve_all(&self, domains: &[String], options: &ResolveOptions) -> Vec<NormalizedRecord> {
        stream::iter(domains)
            .map(|domain| self.resolve(domain, options))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    pub(crate) async fn resolve_with_log(
        &self,
        input: &str,
        options: &ResolveOptions,
    ) -> (NormalizedRecord, AttemptLog) {
        let domain = normalize_domain(input);
        let budget = options
            .timeout
            .unwrap_or(self.config.overall_timeout)
            .min(MAX_OVERALL_TIMEOUT);
        let now = Instant::now();
        let deadline = now.checked_add(budget).unwrap_or(now);
        let started = std::time::Instant::now();

        let mut work = WorkingRecord::new(&domain);
        let mut log = AttemptLog::default();

        let record = match self.run(&domain, options, deadline, &mut work, &mut log).await {
            Ok(()) => work.freeze(&log),
            Err(e) => {
                tracing::debug!(domain = %domain, error = %e, "Resolution exhausted");
                error_record(&domain, log.render(&domain), Some(e.to_string()))
            }
        };

        tracing::info!(
            domain = %record.domain,
            source = %record.source_protocol,
            host = record.source_host.as_deref().unwrap_or("-"),
            registration = %record.registration,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Resolution finished"
        );
        (record, log)
    }

    /// Drive the state machine until DONE. Only STATIC_FALLBACK can fail,
    /// with [`LookupError::ResolutionExhausted`].
    async fn run(
        &self,
        domain: &str,
        options: &ResolveOptions,
        deadline: Instant,
        work: &mut WorkingRecord,
        log: &mut AttemptLog,
    ) -> Result<(), LookupError> {
        let protocol = match options.protocol {
            Protocol::Auto => self.config.protocol,
            explicit => explicit,
        };
        let explicit_server = options
            .server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let valid = match validate_domain(domain) {
            Ok(()) => true,
            Err(e) => {
                log.push("input", Outcome::Error, e.to_string());
                false
            }
        };

        let mut stage = Stage::PopularLookup;
        loop {
            tracing::debug!(domain, stage = %stage, "Entering stage");

            stage = match stage {
                Stage::PopularLookup => {
                    if let Some(entry) = self.static_table.lookup(domain) {
                        work.merge(entry.to_partial(), SourceProtocol::Static, STATIC_HOST);
                        log.push(STATIC_HOST, Outcome::Success, "seeded from well-known table");
                    }

                    if !valid {
                        Stage::StaticFallback
                    } else if explicit_server.is_some() || protocol == Protocol::Whois {
                        Stage::Whois
                    } else {
                        Stage::Rdap
                    }
                }

                Stage::Rdap => {
                    let next = if protocol == Protocol::Rdap {
                        Stage::StaticFallback
                    } else {
                        Stage::Whois
                    };

                    if !cfg!(feature = "rdap") {
                        next
                    } else {
                        match self.rdap_attempt(domain, deadline, work, log).await {
                            Ok(true) => Stage::Done,
                            Ok(false) => next,
                            Err(DeadlinePassed) => self.deadline_passed(work, log),
                        }
                    }
                }

                Stage::Whois => {
                    let hosts = match &explicit_server {
                        Some(server) => vec![server.clone()],
                        None => self.whois_hosts(domain),
                    };

                    if !cfg!(feature = "whois") {
                        Stage::Aggregator
                    } else {
                        match self.whois_attempt(domain, &hosts, deadline, log).await {
                            Ok(Some(answer)) => self.accept_whois(answer, explicit_server.is_none(), work, log),
                            Ok(None) => Stage::Aggregator,
                            Err(DeadlinePassed) => self.deadline_passed(work, log),
                        }
                    }
                }

                Stage::Aggregator => {
                    if !cfg!(feature = "aggregators") || !self.config.enable_aggregators {
                        log.push("aggregators", Outcome::Empty, "disabled");
                        Stage::StaticFallback
                    } else if self.aggregators.usable_providers().next().is_none() {
                        log.push("aggregators", Outcome::Empty, "no usable provider configured");
                        Stage::StaticFallback
                    } else {
                        match timeout_at(deadline, self.aggregators.race(domain)).await {
                            Ok(Ok(hit)) => {
                                log.push(
                                    format!("aggregator:{}", hit.provider),
                                    Outcome::Success,
                                    "registration data",
                                );
                                work.merge(hit.record, SourceProtocol::Aggregator, &hit.provider);
                                Stage::Done
                            }
                            Ok(Err(failures)) => {
                                for (name, e) in failures {
                                    log.push(format!("aggregator:{}", name), Outcome::Error, e.to_string());
                                }
                                Stage::StaticFallback
                            }
                            Err(_) => self.deadline_passed(work, log),
                        }
                    }
                }

                Stage::StaticFallback => {
                    self.static_fallback(domain, valid, protocol, explicit_server.is_some(), deadline, work, log)
                        .await?;
                    Stage::Done
                }

                Stage::Done => return Ok(()),
            };
        }
    }

    /// Returns `Ok(true)` when RDAP supplied registration data.
    async fn rdap_attempt(
        &self,
        domain: &str,
        deadline: Instant,
        work: &mut WorkingRecord,
        log: &mut AttemptLog,
    ) -> Result<bool, DeadlinePassed> {
        let result = timeout_at(deadline, self.rdap.query(domain))
            .await
            .map_err(|_| DeadlinePassed)?;

        match result {
            Ok(doc) => {
                let mut record = rdap_json::parse(&doc.json, domain);
                record.raw = doc.body;

                if record.has_data() {
                    log.push(format!("rdap:{}", doc.host), Outcome::Success, "registration data");
                    work.merge(record, SourceProtocol::Rdap, &doc.host);
                    Ok(true)
                } else {
                    log.push(format!("rdap:{}", doc.host), Outcome::Empty, "no registration fields");
                    work.note(format!("RDAP at {} returned no registration data", doc.host));
                    Ok(false)
                }
            }
            Err(e) => {
                log.push("rdap", Outcome::Error, e.to_string());
                work.note(format!("RDAP unavailable ({})", e));
                Ok(false)
            }
        }
    }

    /// TLD host first, then the generic mirrors, without duplicates.
    fn whois_hosts(&self, domain: &str) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        if let Some(info) = self.tld_table.lookup(domain) {
            hosts.push(info.host);
        }
        for mirror in &self.config.whois_mirrors {
            if !hosts.iter().any(|h| h.eq_ignore_ascii_case(mirror)) {
                hosts.push(mirror.clone());
            }
        }
        hosts
    }

    /// Query hosts in order and stop at the first valid answer. Later hosts
    /// are only asked after a transport failure; an answer without core
    /// fields is still kept and sends the lookup on to the aggregators.
    async fn whois_attempt(
        &self,
        domain: &str,
        hosts: &[String],
        deadline: Instant,
        log: &mut AttemptLog,
    ) -> Result<Option<WhoisAnswer>, DeadlinePassed> {
        for host in hosts {
            let result = timeout_at(deadline, self.whois.query(domain, host))
                .await
                .map_err(|_| DeadlinePassed);

            let text = match result {
                Err(passed) => {
                    log.push(format!("whois:{}", host), Outcome::Error, "overall deadline passed");
                    return Err(passed);
                }
                Ok(Err(e)) => {
                    log.push(format!("whois:{}", host), Outcome::Error, e.to_string());
                    continue;
                }
                Ok(Ok(text)) => text,
            };

            let record = whois_text::parse(&text, domain);
            let not_found = is_not_found(&text) && !record.has_core_data();
            let referral = record
                .referral
                .clone()
                .filter(|r| !r.eq_ignore_ascii_case(host));

            let (outcome, detail) = if not_found {
                (Outcome::Success, "not found")
            } else if !record.core_missing {
                (Outcome::Success, "registration data")
            } else if referral.is_some() {
                (Outcome::Success, "referral only")
            } else {
                (Outcome::Empty, "no registrar or dates")
            };
            log.push(format!("whois:{}", host), outcome, detail);

            return Ok(Some(WhoisAnswer {
                host: host.clone(),
                record,
                not_found,
                referral,
            }));
        }

        Ok(None)
    }

    /// Merge a WHOIS answer and pick the next stage.
    fn accept_whois(
        &self,
        answer: WhoisAnswer,
        follow_referrals: bool,
        work: &mut WorkingRecord,
        log: &mut AttemptLog,
    ) -> Stage {
        let WhoisAnswer {
            host,
            record,
            not_found,
            referral,
        } = answer;

        if not_found {
            work.clear_data();
            work.merge(record, SourceProtocol::Whois, &host);
            work.status = Some("available".to_string());
            work.available = true;
            work.note(format!("{} reports no registration for {}", host, work.domain));
            return Stage::Done;
        }

        if let Some(referral) = referral.filter(|_| follow_referrals) {
            work.needs_follow_up = true;
            work.note(format!(
                "Referral to {}; query it with an explicit server for registrar details",
                referral
            ));
            work.referral_server = Some(referral);
        }

        let core_missing = record.core_missing;
        // An answer without data must not relabel data from an earlier stage
        if record.has_data() || !work.contributed() {
            work.merge(record, SourceProtocol::Whois, &host);
        } else {
            log.push("merge", Outcome::Empty, format!("kept earlier data over {}", host));
        }

        if core_missing {
            Stage::Aggregator
        } else {
            Stage::Done
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn static_fallback(
        &self,
        domain: &str,
        valid: bool,
        protocol: Protocol,
        explicit: bool,
        deadline: Instant,
        work: &mut WorkingRecord,
        log: &mut AttemptLog,
    ) -> Result<(), LookupError> {
        if work.contributed() {
            if work.is_static() {
                work.note("Live sources gave no data; using built-in reference data");
            }
            return Ok(());
        }

        if let Some(entry) = self.static_table.lookup(domain) {
            work.merge(entry.to_partial(), SourceProtocol::Static, STATIC_HOST);
            return Ok(());
        }

        // Mirrors are WHOIS; an explicit server or an RDAP-only call rules
        // them out
        if valid && !explicit && protocol != Protocol::Rdap && cfg!(feature = "whois") {
            let tried = log.whois_hosts().into_iter().map(str::to_string).collect::<Vec<_>>();
            let untried: Vec<String> = self
                .config
                .whois_mirrors
                .iter()
                .filter(|m| !tried.iter().any(|t| t.eq_ignore_ascii_case(m)))
                .cloned()
                .collect();

            if !untried.is_empty() {
                match self.whois_attempt(domain, &untried, deadline, log).await {
                    Ok(Some(answer)) if answer.not_found || answer.record.has_data() => {
                        self.accept_whois(answer, true, work, log);
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(DeadlinePassed) => {
                        self.deadline_passed(work, log);
                        return Ok(());
                    }
                }
            }
        }

        Err(LookupError::exhausted(
            domain,
            format!("No source returned data ({} attempts)", log.entries().len()),
        ))
    }

    fn deadline_passed(&self, work: &mut WorkingRecord, log: &mut AttemptLog) -> Stage {
        log.push("watchdog", Outcome::Error, "overall deadline passed");
        work.note("Overall timeout reached; result may be incomplete");
        Stage::Done
    }
}
