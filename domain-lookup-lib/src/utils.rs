//! Utility functions for domain processing and validation.
//!
//! Helpers for turning user input into the canonical query form and for
//! basic syntax checks before anything touches the network.

use crate::error::LookupError;

/// Canonical form of a user-supplied domain.
///
/// Lower-cases, trims, strips a URL scheme, any path/query/port, a leading
/// `www.` and a trailing root dot.
///
/// ```rust
/// use domain_lookup_lib::normalize_domain;
///
/// assert_eq!(normalize_domain("https://www.Example.COM/about"), "example.com");
/// ```
pub fn normalize_domain(input: &str) -> String {
    let mut domain = input.trim().to_lowercase();

    if let Some(idx) = domain.find("://") {
        domain = domain[idx + 3..].to_string();
    }

    // Cut at the first path, query, fragment or port separator
    if let Some(idx) = domain.find(['/', '?', '#', ':']) {
        domain.truncate(idx);
    }

    if let Some(rest) = domain.strip_prefix("www.") {
        domain = rest.to_string();
    }

    domain.trim_end_matches('.').to_string()
}

/// Validate a normalized domain name.
///
/// Requires at least two labels and RFC-ish label syntax. Internationalized
/// labels are accepted as long as they are alphanumeric.
pub fn validate_domain(domain: &str) -> Result<(), LookupError> {
    if domain.is_empty() {
        return Err(LookupError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if !is_valid_fqdn(domain) {
        return Err(LookupError::invalid_domain(
            domain,
            "Expected a name like example.com",
        ));
    }

    Ok(())
}

/// Validate that an FQDN has basic valid structure.
fn is_valid_fqdn(domain: &str) -> bool {
    if domain.len() < 3 || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 63
            && !part.starts_with('-')
            && !part.ends_with('-')
            && part.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}

/// Parse a duration string like "5s", "30s", "2m" or a bare number of
/// seconds. Zero is rejected.
pub fn parse_duration_str(value: &str) -> Option<std::time::Duration> {
    let value = value.trim().to_lowercase();

    let secs = if let Some(ms) = value.strip_suffix("ms") {
        return ms
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .map(std::time::Duration::from_millis);
    } else if let Some(s) = value.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = value.strip_suffix('m') {
        m.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        value.parse::<u64>().ok()
    };

    secs.filter(|s| *s > 0).map(std::time::Duration::from_secs)
}
