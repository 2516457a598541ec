//! Aggregator API client.
//!
//! All usable providers are queried at once. The first response whose
//! adapted record carries registration data wins; the remaining requests
//! are dropped with the `FuturesUnordered` set.

use crate::error::TransportError;
use crate::parsers::aggregator::adapt;
use crate::protocols::transport::HttpClient;
use crate::types::{AggregatorProvider, HttpMethod, PartialRecord};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;

/// The response that won the race.
#[derive(Debug, Clone)]
pub struct AggregatorHit {
    /// Provider name, used as `source_host`
    pub provider: String,
    pub record: PartialRecord,
}

/// Races the configured aggregator providers.
#[derive(Clone)]
pub struct AggregatorClient {
    http: Arc<dyn HttpClient>,
    providers: Vec<AggregatorProvider>,
    /// Budget for each provider call
    timeout: Duration,
}

impl AggregatorClient {
    pub fn new(http: Arc<dyn HttpClient>, providers: Vec<AggregatorProvider>, timeout: Duration) -> Self {
        Self {
            http,
            providers,
            timeout,
        }
    }

    /// Providers that are enabled and have every credential they need.
    pub fn usable_providers(&self) -> impl Iterator<Item = &AggregatorProvider> {
        self.providers.iter().filter(|p| p.is_usable())
    }

    /// Query every usable provider concurrently.
    ///
    /// Returns the first hit in arrival order, or every provider's failure
    /// when none produced data.
    pub async fn race(&self, domain: &str) -> Result<AggregatorHit, Vec<(String, TransportError)>> {
        let mut pending: FuturesUnordered<_> = self
            .usable_providers()
            .map(|provider| async move {
                let result = self.call(provider, domain).await;
                (provider.name.clone(), result)
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((name, result)) = pending.next().await {
            match result {
                Ok(record) => {
                    tracing::debug!(domain, provider = %name, "Aggregator answered first");
                    return Ok(AggregatorHit {
                        provider: name,
                        record,
                    });
                }
                Err(e) => {
                    tracing::debug!(domain, provider = %name, error = %e, "Aggregator failed");
                    failures.push((name, e));
                }
            }
        }

        Err(failures)
    }

    async fn call(&self, provider: &AggregatorProvider, domain: &str) -> Result<PartialRecord, TransportError> {
        let url = provider.request_url(domain);
        let headers = [("Accept", "application/json")];

        let response = match provider.method {
            HttpMethod::Get => self.http.get(&url, &headers, self.timeout).await?,
            HttpMethod::Post => {
                let body = serde_json::json!({ "domain": domain }).to_string();
                let headers = [("Accept", "application/json"), ("Content-Type", "application/json")];
                self.http.post(&url, &headers, &body, self.timeout).await?
            }
        };

        if !response.is_success() {
            return Err(TransportError::malformed(
                &provider.name,
                format!("HTTP {}", response.status),
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| TransportError::malformed(&provider.name, format!("not JSON: {}", e)))?;

        let mut record = adapt(provider.kind, &json, domain);
        if !record.has_data() {
            return Err(TransportError::malformed(&provider.name, "no registration data"));
        }

        record.raw = response.body;
        Ok(record)
    }
}
