//! Container classification
//!
//! Decides whether a container is observed and which record name it
//! occupies. Classification is a pure function of the descriptor: no
//! network calls, no state.

use crate::config::{ClassifierConfig, validate_domain_name};
use crate::traits::{ContainerDescriptor, fqdn};
use tracing::debug;

/// Result of classifying a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Whether the container should be registered
    pub in_scope: bool,
    /// Record name (with trailing dot), when one can be derived
    pub record_name: Option<String>,
}

impl Classification {
    fn observed(record_name: String) -> Self {
        Self {
            in_scope: true,
            record_name: Some(record_name),
        }
    }

    fn ignored(record_name: Option<String>) -> Self {
        Self {
            in_scope: false,
            record_name,
        }
    }
}

/// Classifies containers according to the configured convention
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Create a classifier from configuration
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// The configuration this classifier applies
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a container
    ///
    /// A missing identity label is never a match.
    pub fn classify(&self, descriptor: &ContainerDescriptor) -> Classification {
        match &self.config {
            ClassifierConfig::ContainerName {
                container,
                record_name,
            } => {
                let record_name = fqdn(record_name);
                let wanted = normalized_container_name(container);
                if normalized_container_name(&descriptor.name) == wanted {
                    Classification::observed(record_name)
                } else {
                    Classification::ignored(Some(record_name))
                }
            }
            ClassifierConfig::Label {
                label,
                suffix,
                domain,
            } => {
                let Some(value) = descriptor.labels.get(label) else {
                    return Classification::ignored(None);
                };
                let value = value.trim();
                if value.len() <= suffix.len() || !value.ends_with(suffix.as_str()) {
                    return Classification::ignored(None);
                }
                let record_name = format!(
                    "{}.{}",
                    value.to_ascii_lowercase(),
                    domain.trim_matches('.')
                );
                // Label text is untrusted; a value that cannot form a DNS name is skipped
                if let Err(e) = validate_domain_name(&record_name) {
                    debug!(
                        container_id = %descriptor.id,
                        value,
                        error = %e,
                        "Label value does not form a valid record name"
                    );
                    return Classification::ignored(None);
                }
                Classification::observed(fqdn(&record_name))
            }
        }
    }
}

/// Container names reported by the runtime start with a `/`
pub fn normalized_container_name(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}
