//! Domain Lookup CLI Application
//!
//! A command-line interface for looking up domain registration data over
//! RDAP, WHOIS and aggregator APIs. This CLI application is a thin caller of
//! the domain-lookup-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use domain_lookup_lib::{
    load_env_config, parse_duration_str, ConfigManager, DomainResolver, EnvConfig, LookupConfig,
    Protocol, ResolveOptions,
};
use futures_util::StreamExt;
use std::process;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-lookup
#[derive(Parser, Debug)]
#[command(name = "domain-lookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Look up domain registration data over RDAP, WHOIS and aggregator APIs")]
#[command(
    long_about = "Look up registrar, dates, name servers and status for domains.\n\nTries RDAP first, then the registry's WHOIS server and public mirrors, then third-party aggregator APIs, and merges the answers into one record per domain."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain names to look up
    #[arg(value_name = "DOMAINS", help_heading = "Domain Selection")]
    pub domains: Vec<String>,

    /// Input file with domains (one per line, # comments)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Domain Selection"
    )]
    pub file: Option<String>,

    /// Query this WHOIS server only (skips RDAP)
    #[arg(long = "server", value_name = "HOST", help_heading = "Protocol")]
    pub server: Option<String>,

    /// Sources to use: auto, rdap or whois
    #[arg(long = "protocol", value_name = "PROTOCOL", help_heading = "Protocol")]
    pub protocol: Option<Protocol>,

    /// Disable IANA bootstrap (use only built-in RDAP endpoints)
    #[arg(long = "no-bootstrap", help_heading = "Protocol")]
    pub no_bootstrap: bool,

    /// Skip third-party aggregator APIs
    #[arg(long = "no-aggregators", help_heading = "Protocol")]
    pub no_aggregators: bool,

    /// Overall budget per domain, e.g. 20s or 1m
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Max concurrent lookups (default: 5, max: 50)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Output results as a JSON array
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Include the raw source payload
    #[arg(short = 'r', long = "raw", help_heading = "Output Format")]
    pub raw: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging to stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_tracing(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_lookup(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only results. `RUST_LOG` wins over
/// the default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "domain_lookup=debug,domain_lookup_lib=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.domains.is_empty() && args.file.is_none() {
        return Err("You must specify domain names or a file with --file".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 50 {
            return Err("Concurrency must be between 1 and 50".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_duration_str(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use a non-zero value like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(server) = &args.server {
        if server.trim().is_empty() || server.contains(char::is_whitespace) {
            return Err(format!("Invalid WHOIS server '{}'", server));
        }
    }

    if args.server.is_some() && args.protocol == Some(Protocol::Rdap) {
        return Err("Cannot use --server with --protocol rdap".to_string());
    }

    Ok(())
}

async fn run_lookup(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_config = load_env_config(args.verbose);
    let config = build_config(&args, &env_config)?;
    let json = args.json || env_config.json == Some(true);

    let domains = get_domains_to_lookup(&args)?;
    let resolver = DomainResolver::with_config(config)?;

    let mut options = ResolveOptions::default();
    if let Some(server) = &args.server {
        options = options.with_server(server.trim());
    }

    tracing::debug!(
        domains = domains.len(),
        concurrency = resolver.config().concurrency,
        "Starting lookups"
    );

    if json {
        let records = resolver.resolve_all(&domains, &options).await;
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    run_streaming_lookup(&resolver, domains, &options, &args).await;
    Ok(())
}

/// Print records as they complete, then a summary for multi-domain runs.
async fn run_streaming_lookup(
    resolver: &DomainResolver,
    domains: Vec<String>,
    options: &ResolveOptions,
    args: &Args,
) {
    let total = domains.len();
    if total > 1 {
        ui::print_header(total, resolver.config().concurrency);
    }

    let mut counts = ui::Counts::default();
    let mut completed = 0usize;
    let start_time = std::time::Instant::now();

    let mut stream = std::pin::pin!(resolver.resolve_stream(domains, options));
    while let Some(record) = stream.next().await {
        completed += 1;
        counts.add(&record);

        let counter = (total > 1).then_some((completed, total));
        ui::print_record(&record, args.raw, counter);
    }

    if total > 1 {
        println!();
        ui::print_summary(&counts, start_time.elapsed());
    }
}

/// Build the resolver configuration: files, then `DL_*` environment, then
/// CLI flags, each layer overriding the previous one.
fn build_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<LookupConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    let explicit_path = args.config.as_ref().or(env_config.config.as_ref());
    let file_config = match explicit_path {
        Some(path) => {
            tracing::debug!(path = %path, "Using explicit config file");
            config_manager
                .load_file(path)
                .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?
        }
        None => config_manager.discover_and_load(),
    };

    let config = file_config.apply_to(LookupConfig::default());
    let config = env_config.apply_to(config);
    apply_cli_args_to_config(config, args)
}

fn apply_cli_args_to_config(
    mut config: LookupConfig,
    args: &Args,
) -> Result<LookupConfig, Box<dyn std::error::Error>> {
    if let Some(protocol) = args.protocol {
        config.protocol = protocol;
    }

    if let Some(timeout) = &args.timeout {
        let timeout = parse_duration_str(timeout)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
        config = config.with_overall_timeout(timeout);
    }

    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }

    if args.no_bootstrap {
        config = config.with_bootstrap(false);
    }

    if args.no_aggregators {
        config = config.with_aggregators_enabled(false);
    }

    Ok(config)
}

/// Domains from the command line followed by those from `--file`,
/// duplicates removed.
fn get_domains_to_lookup(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut domains: Vec<String> = args.domains.clone();

    if let Some(file_path) = &args.file {
        domains.extend(read_domains_from_file(file_path)?);
    }

    let mut seen = std::collections::HashSet::new();
    domains.retain(|d| seen.insert(d.trim().to_lowercase()));

    if domains.is_empty() {
        return Err("No domains to look up".into());
    }

    Ok(domains)
}

fn read_domains_from_file(file_path: &str) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::path::Path;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {}", file_path).into());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut domains = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Warning: line {}: {}", idx + 1, e);
                continue;
            }
        };

        // Handle inline comments
        let domain = line.split('#').next().unwrap_or("").trim();
        if !domain.is_empty() {
            domains.push(domain.to_string());
        }
    }

    if domains.is_empty() {
        return Err(format!("No domains found in {}", file_path).into());
    }

    Ok(domains)
}
