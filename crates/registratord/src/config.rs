//! Environment configuration for the daemon
//!
//! Every setting comes from an environment variable. Unset variables fall
//! back to the core defaults; set-but-invalid values are errors.

use anyhow::{Context, Result};
use registrator_core::config::{
    AddressKind, ClassifierConfig, DEFAULT_CONTAINER, DEFAULT_IDENTITY_LABEL, DEFAULT_RECORD_NAME,
    DEFAULT_SERVICE_DOMAIN, DEFAULT_SERVICE_SUFFIX, ProviderConfig, RecordTypePolicy,
    RegistratorConfig,
};
use std::env;
use std::net::SocketAddr;

/// Default bind address of the liveness endpoint
const DEFAULT_LIVENESS_ADDR: &str = "0.0.0.0:8080";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine and collaborator configuration
    pub core: RegistratorConfig,

    /// Liveness endpoint bind address
    pub liveness_addr: SocketAddr,

    /// Log level for the tracing subscriber
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut core = RegistratorConfig::default();

        if let Some(zone_id) = var("REGISTRATOR_ZONE_ID") {
            core.zone_id = zone_id;
        }

        core.classifier = match var("REGISTRATOR_MODE").as_deref() {
            None | Some("container_name") => ClassifierConfig::ContainerName {
                container: var("REGISTRATOR_CONTAINER")
                    .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
                record_name: var("REGISTRATOR_RECORD_NAME")
                    .unwrap_or_else(|| DEFAULT_RECORD_NAME.to_string()),
            },
            Some("label") => ClassifierConfig::Label {
                label: var("REGISTRATOR_LABEL")
                    .unwrap_or_else(|| DEFAULT_IDENTITY_LABEL.to_string()),
                suffix: var("REGISTRATOR_SUFFIX")
                    .unwrap_or_else(|| DEFAULT_SERVICE_SUFFIX.to_string()),
                domain: var("REGISTRATOR_DOMAIN")
                    .unwrap_or_else(|| DEFAULT_SERVICE_DOMAIN.to_string()),
            },
            Some(other) => anyhow::bail!(
                "REGISTRATOR_MODE '{}' is not supported. Supported modes: container_name, label",
                other
            ),
        };

        if let Some(ttl) = var("REGISTRATOR_TTL") {
            core.record.ttl = ttl
                .parse()
                .with_context(|| format!("REGISTRATOR_TTL must be an integer. Got: {}", ttl))?;
        }
        if let Some(weight) = var("REGISTRATOR_WEIGHT") {
            core.record.weight = weight.parse().with_context(|| {
                format!("REGISTRATOR_WEIGHT must be an integer. Got: {}", weight)
            })?;
        }
        if let Some(record_type) = var("REGISTRATOR_RECORD_TYPE") {
            core.record.record_type = match record_type.to_lowercase().as_str() {
                "auto" => RecordTypePolicy::Auto,
                "a" => RecordTypePolicy::A,
                "cname" => RecordTypePolicy::Cname,
                _ => anyhow::bail!(
                    "REGISTRATOR_RECORD_TYPE '{}' is not valid. Valid types: auto, a, cname",
                    record_type
                ),
            };
        }

        let dry_run = parse_bool("REGISTRATOR_DRY_RUN", var("REGISTRATOR_DRY_RUN"))?;
        core.provider = match var("REGISTRATOR_PROVIDER").as_deref() {
            None | Some("route53") => ProviderConfig::Route53 {
                region: var("REGISTRATOR_REGION")
                    .or_else(|| var("AWS_REGION"))
                    .unwrap_or_else(|| "us-east-1".to_string()),
                dry_run,
            },
            Some("memory") => ProviderConfig::Memory,
            Some(other) => anyhow::bail!(
                "REGISTRATOR_PROVIDER '{}' is not supported. Supported providers: route53, memory",
                other
            ),
        };

        if let Some(endpoint) = var("REGISTRATOR_METADATA_ENDPOINT") {
            core.metadata.endpoint = endpoint;
        }
        if let Some(address) = var("REGISTRATOR_ADDRESS") {
            core.metadata.address = match address.as_str() {
                "public_hostname" => AddressKind::PublicHostname,
                "local_ipv4" => AddressKind::LocalIpv4,
                _ => anyhow::bail!(
                    "REGISTRATOR_ADDRESS '{}' is not valid. \
                    Valid kinds: public_hostname, local_ipv4",
                    address
                ),
            };
        }

        if let Some(docker_host) = var("DOCKER_HOST") {
            core.runtime.docker_host = docker_host;
        }

        core.engine.purge_on_start =
            parse_bool("REGISTRATOR_PURGE_ON_START", var("REGISTRATOR_PURGE_ON_START"))?;

        let liveness_addr = var("REGISTRATOR_LIVENESS_ADDR")
            .unwrap_or_else(|| DEFAULT_LIVENESS_ADDR.to_string());
        let liveness_addr = liveness_addr.parse().with_context(|| {
            format!(
                "REGISTRATOR_LIVENESS_ADDR must be a socket address. Got: {}",
                liveness_addr
            )
        })?;

        Ok(Self {
            core,
            liveness_addr,
            log_level: var("REGISTRATOR_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.core.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "REGISTRATOR_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        let route53 = matches!(self.core.provider, ProviderConfig::Route53 { .. });
        if cfg!(not(feature = "route53")) && route53 {
            anyhow::bail!(
                "REGISTRATOR_PROVIDER=route53 requires the 'route53' feature. \
                Rebuild with it or set REGISTRATOR_PROVIDER=memory"
            );
        }

        Ok(())
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => anyhow::bail!("{} must be true or false. Got: {}", key, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_watch_the_registry_container() {
        let config = load(&[]).unwrap();

        assert_eq!(config.core.zone_id, "Z1P7DHMHEAX6O3");
        assert_eq!(config.core.classifier, ClassifierConfig::default());
        assert_eq!(
            config.core.provider,
            ProviderConfig::Route53 {
                region: "us-east-1".to_string(),
                dry_run: false,
            }
        );
        assert_eq!(config.core.runtime.docker_host, "unix:///var/run/docker.sock");
        assert_eq!(config.liveness_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn label_mode_reads_convention() {
        let config = load(&[
            ("REGISTRATOR_MODE", "label"),
            ("REGISTRATOR_DOMAIN", "svc.internal"),
            ("REGISTRATOR_PROVIDER", "memory"),
        ])
        .unwrap();

        assert_eq!(
            config.core.classifier,
            ClassifierConfig::Label {
                label: "registrator.service".to_string(),
                suffix: "-service".to_string(),
                domain: "svc.internal".to_string(),
            }
        );
        assert_eq!(config.core.provider, ProviderConfig::Memory);
    }

    #[test]
    fn record_and_runtime_overrides() {
        let config = load(&[
            ("REGISTRATOR_TTL", "60"),
            ("REGISTRATOR_WEIGHT", "10"),
            ("REGISTRATOR_RECORD_TYPE", "CNAME"),
            ("REGISTRATOR_ADDRESS", "local_ipv4"),
            ("REGISTRATOR_DRY_RUN", "true"),
            ("REGISTRATOR_REGION", "eu-west-1"),
            ("DOCKER_HOST", "tcp://10.0.0.1:2375"),
        ])
        .unwrap();

        assert_eq!(config.core.record.ttl, 60);
        assert_eq!(config.core.record.weight, 10);
        assert_eq!(config.core.record.record_type, RecordTypePolicy::Cname);
        assert_eq!(config.core.metadata.address, AddressKind::LocalIpv4);
        assert_eq!(config.core.runtime.docker_host, "tcp://10.0.0.1:2375");
        assert_eq!(
            config.core.provider,
            ProviderConfig::Route53 {
                region: "eu-west-1".to_string(),
                dry_run: true,
            }
        );
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(load(&[("REGISTRATOR_TTL", "five")]).is_err());
        assert!(load(&[("REGISTRATOR_MODE", "all")]).is_err());
        assert!(load(&[("REGISTRATOR_PROVIDER", "clouddns")]).is_err());
        assert!(load(&[("REGISTRATOR_DRY_RUN", "maybe")]).is_err());
        assert!(load(&[("REGISTRATOR_LIVENESS_ADDR", "localhost")]).is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let config = load(&[("REGISTRATOR_WEIGHT", "300")]).unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("REGISTRATOR_LOG_LEVEL", "verbose")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn purge_requires_container_name_mode() {
        let config = load(&[
            ("REGISTRATOR_MODE", "label"),
            ("REGISTRATOR_PURGE_ON_START", "true"),
        ])
        .unwrap();
        assert!(config.validate().is_err());

        let config = load(&[("REGISTRATOR_PURGE_ON_START", "true")]).unwrap();
        assert!(config.validate().is_ok());
    }
}
