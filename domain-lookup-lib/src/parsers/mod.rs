//! Response parsers.
//!
//! Every source format ends up as a [`crate::types::PartialRecord`]:
//! WHOIS text, RDAP JSON and the aggregator vendor payloads.

pub mod aggregator;
pub mod rdap_json;
pub mod whois_text;

pub use whois_text::is_not_found;
