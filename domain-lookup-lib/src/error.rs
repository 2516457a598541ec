//! Error handling for domain lookup operations.
//!
//! Two layers live here. `TransportError` is what the WHOIS, RDAP and
//! aggregator transports raise; the resolver always catches it and turns it
//! into an attempt-log entry. `LookupError` covers the fallible library
//! surface outside the resolver (configuration, client construction, input
//! files) plus the one internal condition the state machine may report.

use std::fmt;
use std::time::Duration;

/// Failure of a single network exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The exchange did not finish within its budget
    Timeout { host: String, after: Duration },

    /// The peer could not be reached (DNS failure, connection refused, TLS)
    Refused { host: String, detail: String },

    /// The connection broke while reading or writing
    Reset { host: String, detail: String },

    /// The exchange finished but the payload is unusable (too short,
    /// not JSON, HTTP error status, rate-limit banner)
    MalformedResponse { host: String, detail: String },
}

impl TransportError {
    pub fn timeout<H: Into<String>>(host: H, after: Duration) -> Self {
        Self::Timeout {
            host: host.into(),
            after,
        }
    }

    pub fn refused<H: Into<String>, D: Into<String>>(host: H, detail: D) -> Self {
        Self::Refused {
            host: host.into(),
            detail: detail.into(),
        }
    }

    pub fn reset<H: Into<String>, D: Into<String>>(host: H, detail: D) -> Self {
        Self::Reset {
            host: host.into(),
            detail: detail.into(),
        }
    }

    pub fn malformed<H: Into<String>, D: Into<String>>(host: H, detail: D) -> Self {
        Self::MalformedResponse {
            host: host.into(),
            detail: detail.into(),
        }
    }

    /// Map an I/O error from a socket into the matching transport failure.
    pub fn from_io<H: Into<String>>(host: H, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                Self::timeout(host, Duration::from_secs(0))
            }
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Self::reset(host, err.to_string()),
            _ => Self::refused(host, err.to_string()),
        }
    }

    /// Host (or URL) the failed exchange was aimed at.
    pub fn host(&self) -> &str {
        match self {
            Self::Timeout { host, .. }
            | Self::Refused { host, .. }
            | Self::Reset { host, .. }
            | Self::MalformedResponse { host, .. } => host,
        }
    }

    /// Whether a second try against the same endpoint is worthwhile.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Reset { .. })
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { host, after } => write!(f, "{}: timed out after {:?}", host, after),
            Self::Refused { host, detail } => write!(f, "{}: connection refused ({})", host, detail),
            Self::Reset { host, detail } => write!(f, "{}: connection reset ({})", host, detail),
            Self::MalformedResponse { host, detail } => {
                write!(f, "{}: malformed response ({})", host, detail)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Main error type for the library's fallible APIs.
#[derive(Debug, Clone)]
pub enum LookupError {
    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// A transport failure surfaced outside the resolver
    Transport(TransportError),

    /// JSON or TOML parsing errors
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// Configuration errors (invalid settings, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading config or domain lists
    FileError { path: String, message: String },

    /// Every stage including the static fallback failed unexpectedly
    ResolutionExhausted { domain: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl LookupError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn exhausted<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::ResolutionExhausted {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::Transport(err) => write!(f, "Transport error: {}", err),
            Self::ParseError { message, content: _ } => write!(f, "Parse error: {}", message),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::ResolutionExhausted { domain, message } => {
                write!(f, "Resolution exhausted for '{}': {}", domain, message)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<TransportError> for LookupError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        let host = err
            .url()
            .and_then(|u| u.host_str())
            .unwrap_or("http")
            .to_string();
        if err.is_timeout() {
            Self::Transport(TransportError::timeout(host, Duration::from_secs(0)))
        } else if err.is_connect() {
            Self::Transport(TransportError::refused(host, err.to_string()))
        } else {
            Self::Transport(TransportError::malformed(host, err.to_string()))
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
            content: None,
        }
    }
}

impl From<toml::de::Error> for LookupError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<std::io::Error> for LookupError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
