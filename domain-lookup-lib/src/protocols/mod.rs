//! Protocol clients for registration lookups.
//!
//! Raw WHOIS over TCP, RDAP over HTTPS and third-party aggregator APIs,
//! all built on the transport traits in [`transport`].

/// Aggregator API racing
pub mod aggregator;

/// RDAP (Registration Data Access Protocol) implementation
pub mod rdap;

/// RDAP endpoint registry and bootstrap discovery
pub mod registry;

/// TLD to WHOIS server table
pub mod tld;

/// TCP and HTTP transport traits with their default implementations
pub mod transport;

/// WHOIS protocol implementation
pub mod whois;

pub use aggregator::{AggregatorClient, AggregatorHit};
pub use rdap::{RdapClient, RdapDocument};
pub use registry::BootstrapCache;
pub use tld::{registry_suffix, resolve_server, TldTable};
pub use transport::{HttpClient, HttpResponse, ReqwestHttpClient, TcpLineClient, TokioTcpClient};
pub use whois::WhoisClient;
