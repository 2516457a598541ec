//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DL_*`
//! environment variables, merging them with proper precedence rules, and
//! layering the result over a [`LookupConfig`].

use crate::error::LookupError;
use crate::types::{AggregatorKind, AggregatorProvider, HttpMethod, LookupConfig, Protocol};
use crate::utils::parse_duration_str;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// protocol = "auto"
/// timeout = "20s"
/// bootstrap = true
///
/// [servers]
/// "co.uk" = "whois.nic.uk"
///
/// [[aggregators]]
/// name = "whoisxmlapi"
/// kind = "whoisxml"
/// url = "https://www.whoisxmlapi.com/whoisserver/WhoisService?apiKey={key}&domainName={domain}&outputFormat=JSON"
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for lookup options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// TLD (or compound suffix) to WHOIS host overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, String>>,

    /// Aggregator providers; an entry with a built-in provider's name
    /// replaces it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregators: Option<Vec<AggregatorProvider>>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// "auto", "rdap" or "whois"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    /// Overall timeout per lookup (as string, e.g., "20s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator_timeout: Option<String>,

    /// IANA bootstrap discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,

    /// Run the aggregator stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregators: Option<bool>,

    /// Domains resolved at once by the CLI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_mirrors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rdap_mirrors: Option<Vec<String>>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing or
    /// validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, LookupError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LookupError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            LookupError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| LookupError::config(format!("Failed to parse TOML configuration: {}", e)))?;

        self.validate_config(&config)?;

        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory, then the current
    /// directory. A file that fails to load is skipped with a warning;
    /// discovery itself never fails.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring configuration file"),
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let precedence = if i == loaded_files.len() - 1 { "highest" } else { "lower" };
                tracing::info!(path = %path.display(), precedence, "Merged configuration file");
            }
        }

        merged_config
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./domain-lookup.toml", "./.domain-lookup.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for a configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let path = Path::new(&env::var_os("HOME")?).join(".domain-lookup.toml");
        path.exists().then_some(path)
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-lookup").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher)) => {
                    macro_rules! take {
                        ($($field:ident),*) => {
                            $(if higher.$field.is_some() {
                                lower_defaults.$field = higher.$field;
                            })*
                        };
                    }
                    take!(
                        protocol,
                        timeout,
                        rdap_timeout,
                        whois_timeout,
                        aggregator_timeout,
                        bootstrap,
                        aggregators,
                        concurrency,
                        whois_mirrors,
                        rdap_mirrors
                    );
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: match (lower.servers, higher.servers) {
                (Some(mut lower_servers), Some(higher_servers)) => {
                    lower_servers.extend(higher_servers);
                    Some(lower_servers)
                }
                (lower_servers, higher_servers) => higher_servers.or(lower_servers),
            },
            aggregators: match (lower.aggregators, higher.aggregators) {
                (Some(lower_aggs), Some(higher_aggs)) => Some(merge_providers(lower_aggs, higher_aggs)),
                (lower_aggs, higher_aggs) => higher_aggs.or(lower_aggs),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), LookupError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 50 {
                    return Err(LookupError::config("Concurrency must be between 1 and 50"));
                }
            }

            if let Some(protocol) = &defaults.protocol {
                protocol.parse::<Protocol>().map_err(LookupError::config)?;
            }

            for (key, value) in [
                ("timeout", &defaults.timeout),
                ("rdap_timeout", &defaults.rdap_timeout),
                ("whois_timeout", &defaults.whois_timeout),
                ("aggregator_timeout", &defaults.aggregator_timeout),
            ] {
                if let Some(value) = value {
                    if parse_duration_str(value).is_none() {
                        return Err(LookupError::config(format!(
                            "Invalid {} '{}'. Use a non-zero value like '5s', '30s', '2m'",
                            key, value
                        )));
                    }
                }
            }
        }

        if let Some(servers) = &config.servers {
            for (tld, host) in servers {
                if tld.trim().is_empty() || host.trim().is_empty() || host.contains(' ') {
                    return Err(LookupError::config(format!(
                        "Invalid server override '{}' = '{}'",
                        tld, host
                    )));
                }
            }
        }

        if let Some(aggregators) = &config.aggregators {
            for provider in aggregators {
                if provider.name.trim().is_empty() {
                    return Err(LookupError::config("Aggregator names cannot be empty"));
                }
                if !provider.url.contains("{domain}") && provider.method != HttpMethod::Post {
                    return Err(LookupError::config(format!(
                        "Aggregator '{}' URL must contain {{domain}}",
                        provider.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Later providers replace earlier ones with the same name; new names are
/// appended.
fn merge_providers(
    mut base: Vec<AggregatorProvider>,
    overrides: Vec<AggregatorProvider>,
) -> Vec<AggregatorProvider> {
    for provider in overrides {
        match base.iter_mut().find(|p| p.name == provider.name) {
            Some(existing) => *existing = provider,
            None => base.push(provider),
        }
    }
    base
}

impl FileConfig {
    /// Layer this file configuration over `config`.
    ///
    /// Values were validated at load time; anything that still fails to
    /// parse leaves the existing setting alone.
    pub fn apply_to(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(defaults) = &self.defaults {
            let duration = |value: &Option<String>| value.as_deref().and_then(parse_duration_str);

            if let Some(protocol) = defaults.protocol.as_deref().and_then(|p| p.parse().ok()) {
                config.protocol = protocol;
            }
            if let Some(timeout) = duration(&defaults.timeout) {
                config.overall_timeout = timeout;
            }
            if let Some(timeout) = duration(&defaults.rdap_timeout) {
                config.rdap_timeout = timeout;
            }
            if let Some(timeout) = duration(&defaults.whois_timeout) {
                config.whois_timeout = timeout;
            }
            if let Some(timeout) = duration(&defaults.aggregator_timeout) {
                config.aggregator_timeout = timeout;
            }
            if let Some(bootstrap) = defaults.bootstrap {
                config.enable_bootstrap = bootstrap;
            }
            if let Some(enabled) = defaults.aggregators {
                config.enable_aggregators = enabled;
            }
            if let Some(concurrency) = defaults.concurrency {
                config = config.with_concurrency(concurrency);
            }
            if let Some(mirrors) = &defaults.whois_mirrors {
                config.whois_mirrors = mirrors.clone();
            }
            if let Some(mirrors) = &defaults.rdap_mirrors {
                config.rdap_mirrors = mirrors.clone();
            }
        }

        if let Some(servers) = &self.servers {
            for (tld, host) in servers {
                config = config.with_server_override(tld.as_str(), host.as_str());
            }
        }

        if let Some(aggregators) = &self.aggregators {
            config.aggregators = merge_providers(config.aggregators, aggregators.clone());
        }

        config
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `DL_*`
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub protocol: Option<Protocol>,
    pub timeout: Option<String>,
    pub bootstrap: Option<bool>,
    pub concurrency: Option<usize>,
    pub json: Option<bool>,
    pub config: Option<String>,
    pub whoisxml_api_key: Option<String>,
    pub whoisfreaks_api_key: Option<String>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    parse_env_config(|key| env::var(key).ok(), verbose)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Environment parsing over an arbitrary variable source.
fn parse_env_config<F>(var: F, verbose: bool) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();
    let used = |key: &str, value: &str| {
        if verbose {
            tracing::info!(key, value, "Using environment setting");
        }
    };

    if let Some(val) = var("DL_PROTOCOL") {
        match val.parse::<Protocol>() {
            Ok(protocol) => {
                env_config.protocol = Some(protocol);
                used("DL_PROTOCOL", &val);
            }
            Err(e) => tracing::warn!(value = %val, "Invalid DL_PROTOCOL: {}", e),
        }
    }

    if let Some(val) = var("DL_TIMEOUT") {
        if parse_duration_str(&val).is_some() {
            used("DL_TIMEOUT", &val);
            env_config.timeout = Some(val);
        } else {
            tracing::warn!(value = %val, "Invalid DL_TIMEOUT, use a format like '5s', '30s', '2m'");
        }
    }

    if let Some(val) = var("DL_BOOTSTRAP") {
        match parse_bool(&val) {
            Some(flag) => {
                env_config.bootstrap = Some(flag);
                used("DL_BOOTSTRAP", &val);
            }
            None => tracing::warn!(value = %val, "Invalid DL_BOOTSTRAP, use true/false"),
        }
    }

    if let Some(val) = var("DL_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(n) if (1..=50).contains(&n) => {
                env_config.concurrency = Some(n);
                used("DL_CONCURRENCY", &val);
            }
            _ => tracing::warn!(value = %val, "Invalid DL_CONCURRENCY, must be 1-50"),
        }
    }

    if let Some(val) = var("DL_JSON") {
        match parse_bool(&val) {
            Some(flag) => {
                env_config.json = Some(flag);
                used("DL_JSON", &val);
            }
            None => tracing::warn!(value = %val, "Invalid DL_JSON, use true/false"),
        }
    }

    if let Some(val) = var("DL_CONFIG").filter(|v| !v.trim().is_empty()) {
        used("DL_CONFIG", &val);
        env_config.config = Some(val);
    }

    // Keys are never echoed
    env_config.whoisxml_api_key = var("DL_WHOISXML_API_KEY").filter(|v| !v.trim().is_empty());
    env_config.whoisfreaks_api_key = var("DL_WHOISFREAKS_API_KEY").filter(|v| !v.trim().is_empty());

    env_config
}

impl EnvConfig {
    /// Layer the environment settings over `config`.
    pub fn apply_to(&self, mut config: LookupConfig) -> LookupConfig {
        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(timeout) = self.timeout.as_deref().and_then(parse_duration_str) {
            config.overall_timeout = timeout;
        }
        if let Some(bootstrap) = self.bootstrap {
            config.enable_bootstrap = bootstrap;
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }

        for provider in &mut config.aggregators {
            let key = match provider.kind {
                AggregatorKind::WhoisXml => &self.whoisxml_api_key,
                AggregatorKind::WhoisFreaks => &self.whoisfreaks_api_key,
                _ => &None,
            };
            if let Some(key) = key {
                provider.api_key = Some(key.clone());
            }
        }

        config
    }
}
