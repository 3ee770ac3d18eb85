// # Instance Metadata Address Resolver
//
// This crate resolves the address a host registers under by asking the
// cloud instance metadata service.
//
// ## Behaviour
//
// - One GET per `resolve()` call; the address is never cached because a
//   host's public name can change across stop/start cycles
// - The body is trimmed, an empty body is an error
// - Non-success statuses and transport failures become
//   `Error::AddressResolution`
//
// ## Endpoints
//
// - `public_hostname`: `GET /latest/meta-data/public-hostname`
// - `local_ipv4`: `GET /latest/meta-data/local-ipv4`

use async_trait::async_trait;
use registrator_core::config::MetadataConfig;
use registrator_core::traits::AddressResolver;
use registrator_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for metadata requests (the service is link-local)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(2);

/// Address resolver backed by the instance metadata service
#[derive(Debug, Clone)]
pub struct MetadataAddressResolver {
    /// Full URL of the metadata document holding the address
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl MetadataAddressResolver {
    /// Create a resolver for the configured endpoint and address kind
    pub fn new(config: &MetadataConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a resolver with a custom request timeout
    pub fn with_timeout(config: &MetadataConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.address_url(),
            client,
        })
    }

    /// URL queried on every resolution
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AddressResolver for MetadataAddressResolver {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::address(format!("Metadata request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::address(format!(
                "Metadata service returned {} for {}",
                status, self.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::address(format!("Failed to read metadata response: {}", e)))?;

        let address = body.trim();
        if address.is_empty() {
            return Err(Error::address(format!(
                "Metadata service returned an empty address for {}",
                self.url
            )));
        }

        tracing::debug!(url = %self.url, address, "Resolved host address");
        Ok(address.to_string())
    }

    fn resolver_name(&self) -> &'static str {
        "metadata"
    }
}
