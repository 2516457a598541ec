//! # Domain Lookup Library
//!
//! Resolves registration metadata (registrar, dates, name servers, status)
//! for a domain from several heterogeneous sources and reconciles their
//! answers into one normalized record.
//!
//! Sources are tried in order: a built-in table of well-known domains,
//! RDAP, raw WHOIS on port 43 and third-party aggregator APIs. Every
//! lookup ends in a [`NormalizedRecord`]; failures degrade the record
//! instead of surfacing as errors.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_lookup_lib::{resolve, ResolveOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let record = resolve("example.com", &ResolveOptions::default()).await;
//!
//!     println!(
//!         "{} [{}] registrar: {} expires: {}",
//!         record.domain, record.registration, record.registrar, record.expiry_date
//!     );
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP**: registry endpoints, IANA bootstrap discovery and public mirrors
//! - **WHOIS**: per-TLD servers with mirror fallback and multi-grammar parsing
//! - **Aggregators**: concurrent third-party API racing
//! - **Configurable**: TOML files and `DL_*` environment variables

pub use config::{load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig};
pub use error::{LookupError, TransportError};
pub use fallback::{StaticTable, WellKnownDomain};
pub use resolver::{classify, DomainResolver};
pub use types::{
    default_aggregators, AggregatorKind, AggregatorProvider, HttpMethod, LookupConfig,
    NormalizedRecord, PartialRecord, Protocol, RegistrationState, ResolveOptions, ServerInfo,
    SourceProtocol, UNKNOWN,
};
pub use utils::{normalize_domain, parse_duration_str, validate_domain};

// Public modules
pub mod parsers;
pub mod protocols;

// Internal modules - these are not part of the public API
mod config;
mod error;
mod fallback;
mod resolver;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LookupError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Resolve one domain with the default configuration.
///
/// Builds a fresh [`DomainResolver`] per call; keep a resolver around when
/// looking up many domains so the RDAP bootstrap cache is reused. Never
/// fails: if even the HTTP client cannot be built the result is an
/// [`SourceProtocol::Error`] record.
pub async fn resolve(domain: &str, options: &ResolveOptions) -> NormalizedRecord {
    match DomainResolver::new() {
        Ok(resolver) => resolver.resolve(domain, options).await,
        Err(e) => resolver::error_record(
            &normalize_domain(domain),
            format!("Resolver unavailable: {}", e),
            Some(e.to_string()),
        ),
    }
}

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "rdap")]
    features.push("rdap");

    #[cfg(feature = "whois")]
    features.push("whois");

    #[cfg(feature = "bootstrap")]
    features.push("bootstrap");

    #[cfg(feature = "aggregators")]
    features.push("aggregators");

    features
}
