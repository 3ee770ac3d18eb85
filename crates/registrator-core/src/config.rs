//! Configuration types for the registrator
//!
//! This module defines all configuration structures used throughout the crate.
//! Defaults suit a same-host deployment on an EC2 instance with the Docker
//! socket mounted.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::traits::RecordType;

/// Container watched by the default `container_name` classifier
pub const DEFAULT_CONTAINER: &str = "docker-registry";

/// Record written by the default `container_name` classifier
pub const DEFAULT_RECORD_NAME: &str = "my-test-registry.realtime.bnservers.com";

/// Identity label of the `label` classifier
pub const DEFAULT_IDENTITY_LABEL: &str = "registrator.service";

/// Suffix a label value must carry to be observed
pub const DEFAULT_SERVICE_SUFFIX: &str = "-service";

/// Domain appended to service names
pub const DEFAULT_SERVICE_DOMAIN: &str = "service.discovery";

/// Main registrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistratorConfig {
    /// Hosted zone the records live in
    #[serde(default = "default_zone_id")]
    pub zone_id: String,

    /// Which containers are observed and which name they map to
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Shape of the record sets written
    #[serde(default)]
    pub record: RecordConfig,

    /// DNS provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Host address lookup configuration
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Container runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RegistratorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            zone_id: default_zone_id(),
            classifier: ClassifierConfig::default(),
            record: RecordConfig::default(),
            provider: ProviderConfig::default(),
            metadata: MetadataConfig::default(),
            runtime: RuntimeConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Hosted zone id cannot be empty"));
        }

        self.classifier.validate()?;
        self.record.validate()?;
        self.provider.validate()?;
        self.metadata.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        if self.engine.purge_on_start
            && !matches!(self.classifier, ClassifierConfig::ContainerName { .. })
        {
            return Err(crate::Error::config(
                "purge_on_start requires the container_name classifier",
            ));
        }

        Ok(())
    }
}

impl Default for RegistratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Container classification mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClassifierConfig {
    /// Observe a single container by name and publish it under a fixed record
    ContainerName {
        /// Container name to watch (a leading `/` is optional)
        container: String,
        /// Record name to publish
        record_name: String,
    },

    /// Observe every container whose identity label ends with a suffix
    Label {
        /// Label carrying the service identity
        label: String,
        /// Suffix marking the label value as a registrable service
        suffix: String,
        /// Domain appended to the label value to form the record name
        domain: String,
    },
}

impl ClassifierConfig {
    /// Validate the classifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ClassifierConfig::ContainerName {
                container,
                record_name,
            } => {
                if container.trim_start_matches('/').is_empty() {
                    return Err(crate::Error::config("Container name cannot be empty"));
                }
                validate_domain_name(record_name)
            }
            ClassifierConfig::Label {
                label,
                suffix,
                domain,
            } => {
                if label.is_empty() {
                    return Err(crate::Error::config("Identity label cannot be empty"));
                }
                if suffix.is_empty() {
                    return Err(crate::Error::config(
                        "Service suffix cannot be empty \
                        (it would observe every labelled container)",
                    ));
                }
                validate_domain_name(domain)
            }
        }
    }

    /// Get the mode name
    pub fn mode_name(&self) -> &'static str {
        match self {
            ClassifierConfig::ContainerName { .. } => "container_name",
            ClassifierConfig::Label { .. } => "label",
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig::ContainerName {
            container: DEFAULT_CONTAINER.to_string(),
            record_name: DEFAULT_RECORD_NAME.to_string(),
        }
    }
}

/// Record type written for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordTypePolicy {
    /// Always write A records
    A,
    /// Always write CNAME records
    Cname,
    /// A for IPv4 literals, CNAME for hostnames
    Auto,
}

/// Shape of the record sets the registrator writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: i64,

    /// Routing weight of each host's set
    #[serde(default = "default_weight")]
    pub weight: i64,

    /// Record type selection
    #[serde(default = "default_record_type")]
    pub record_type: RecordTypePolicy,
}

impl RecordConfig {
    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(0..=2_147_483_647).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "Record TTL out of range: {}",
                self.ttl
            )));
        }
        if !(0..=255).contains(&self.weight) {
            return Err(crate::Error::config(format!(
                "Record weight must be between 0 and 255. Got: {}",
                self.weight
            )));
        }
        Ok(())
    }

    /// Record type to write for a value
    pub fn record_type_for(&self, value: &str) -> RecordType {
        match self.record_type {
            RecordTypePolicy::A => RecordType::A,
            RecordTypePolicy::Cname => RecordType::Cname,
            RecordTypePolicy::Auto => {
                if value.parse::<Ipv4Addr>().is_ok() {
                    RecordType::A
                } else {
                    RecordType::Cname
                }
            }
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            weight: default_weight(),
            record_type: default_record_type(),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// AWS Route 53
    Route53 {
        /// AWS region for the API client
        region: String,
        /// Perform queries but only log intended changes
        #[serde(default)]
        dry_run: bool,
    },

    /// In-process zone (nothing leaves the process)
    Memory,
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Route53 { region, .. } => {
                if region.is_empty() {
                    return Err(crate::Error::config("Route 53 region cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Memory => Ok(()),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Route53 { .. } => "route53",
            ProviderConfig::Memory => "memory",
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Route53 {
            region: "us-east-1".to_string(),
            dry_run: false,
        }
    }
}

/// Which host address to publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// Public DNS hostname of the instance
    PublicHostname,
    /// Private IPv4 address of the instance
    LocalIpv4,
}

impl AddressKind {
    /// Metadata path serving this address
    pub fn metadata_path(&self) -> &'static str {
        match self {
            AddressKind::PublicHostname => "latest/meta-data/public-hostname",
            AddressKind::LocalIpv4 => "latest/meta-data/local-ipv4",
        }
    }
}

/// Instance metadata lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Metadata service host (`169.254.169.254`) or base URL
    #[serde(default = "default_metadata_endpoint")]
    pub endpoint: String,

    /// Address to publish
    #[serde(default = "default_address_kind")]
    pub address: AddressKind,
}

impl MetadataConfig {
    /// Validate the metadata configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.endpoint.trim().is_empty() {
            return Err(crate::Error::config("Metadata endpoint cannot be empty"));
        }
        Ok(())
    }

    /// Full URL of the address lookup
    pub fn address_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let base = if base.starts_with("http://") || base.starts_with("https://") {
            base.to_string()
        } else {
            format!("http://{base}")
        };
        format!("{}/{}", base, self.address.metadata_path())
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_metadata_endpoint(),
            address: default_address_kind(),
        }
    }
}

/// Container runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime connection target (`unix://` socket or `tcp://` address)
    #[serde(default = "default_docker_host")]
    pub docker_host: String,

    /// Request timeout for runtime API calls (in seconds)
    #[serde(default = "default_runtime_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_host: default_docker_host(),
            timeout_secs: default_runtime_timeout_secs(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, engine events are dropped (with a warning log). Lifecycle
    /// events themselves are never dropped.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Delete this host's record for the watched container before subscribing
    ///
    /// Only meaningful with the `container_name` classifier.
    #[serde(default)]
    pub purge_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            purge_on_start: false,
        }
    }
}

/// Validate that a string is a usable DNS name
///
/// Basic RFC 1035 checks; a single trailing dot is accepted.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_zone_id() -> String {
    "Z1P7DHMHEAX6O3".to_string()
}

fn default_ttl() -> i64 {
    5
}

fn default_weight() -> i64 {
    50
}

fn default_record_type() -> RecordTypePolicy {
    RecordTypePolicy::Auto
}

fn default_metadata_endpoint() -> String {
    "169.254.169.254".to_string()
}

fn default_address_kind() -> AddressKind {
    AddressKind::PublicHostname
}

fn default_docker_host() -> String {
    "unix:///var/run/docker.sock".to_string()
}

fn default_runtime_timeout_secs() -> u64 {
    120
}

fn default_event_channel_capacity() -> usize {
    1000
}
