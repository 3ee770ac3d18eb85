// # Record Store Trait
//
// Defines the interface for querying and mutating the DNS zone.
//
// ## Implementations
//
// - Route 53: `registrator-provider-route53` crate
// - In-process: [`crate::store::MemoryRecordStore`]
//
// ## Usage
//
// ```rust,ignore
// use registrator_core::{ChangeAction, RecordStore, RegistrationTarget};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//     let target = RegistrationTarget::new("web-service.service.discovery", "10.0.0.5");
//
//     if !store.find_by_name_and_value("Z123", target.record_name(), target.value()).await? {
//         store.apply("Z123", ChangeAction::Create, &target).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

use crate::config::RecordConfig;

/// Ensure a DNS name carries its trailing dot
pub fn fqdn(name: &str) -> String {
    let trimmed = name.trim_end_matches('.');
    format!("{trimmed}.")
}

/// Compare two DNS names ignoring the trailing dot and ASCII case
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// DNS record type of a record set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 host record
    A,
    /// Canonical name record
    Cname,
    /// Any type the registrator never writes (listed for completeness)
    Other(String),
}

impl RecordType {
    /// Wire name of the type
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Other(other) => other,
        }
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value {
            "A" => RecordType::A,
            "CNAME" => RecordType::Cname,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as held by the DNS provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecordSet {
    /// Fully-qualified name, as stored by the provider
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// First (and for registrator-owned sets, only) value
    pub value: String,
    /// Identifier distinguishing weighted sets under one name
    pub set_identifier: Option<String>,
    /// Routing weight
    pub weight: Option<i64>,
    /// Time-to-live in seconds
    pub ttl: Option<i64>,
}

impl ResourceRecordSet {
    /// Build the record set the registrator writes for a target
    ///
    /// The set identifier is the value itself, so every host gets its own
    /// weighted alternative under the shared name.
    pub fn for_target(target: &RegistrationTarget, record: &RecordConfig) -> Self {
        Self {
            name: target.record_name().to_string(),
            record_type: record.record_type_for(target.value()),
            value: target.value().to_string(),
            set_identifier: Some(target.value().to_string()),
            weight: Some(record.weight),
            ttl: Some(record.ttl),
        }
    }
}

/// The unit the reconciler acts on: one name pointing at one host
#[derive(Debug, Clone, Eq)]
pub struct RegistrationTarget {
    record_name: String,
    value: String,
}

impl RegistrationTarget {
    /// Create a target; the record name is normalised to carry a trailing dot
    pub fn new(record_name: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self {
            record_name: fqdn(record_name.as_ref()),
            value: value.into(),
        }
    }

    /// Fully-qualified record name (with trailing dot)
    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Host address the record points at
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl PartialEq for RegistrationTarget {
    fn eq(&self, other: &Self) -> bool {
        names_match(&self.record_name, &other.record_name)
            && self.value.trim_end_matches('.') == other.value.trim_end_matches('.')
    }
}

impl fmt::Display for RegistrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.record_name, self.value)
    }
}

/// Mutation applied to the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    /// Create the record set
    Create,
    /// Delete the record set
    Delete,
}

impl ChangeAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "CREATE",
            ChangeAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider acknowledgement of a submitted change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeAck {
    /// Provider change identifier
    pub id: String,
    /// Provider-reported change status (e.g. `PENDING`)
    pub status: String,
}

/// Trait for DNS record store implementations
///
/// # Trust Level: Untrusted
///
/// Stores are thin pass-throughs to the provider:
///
/// - Exactly one change submitted per `apply`
/// - No retries, no caching, no batching or coalescing
/// - No decisions about whether a change is needed (owned by the reconciler)
///
/// # Errors
///
/// Service-side rejections surface as [`crate::Error::Provider`] with the
/// provider's code and message. Everything else (connectivity, timeouts,
/// malformed responses) surfaces as [`crate::Error::Transport`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List the record sets in the zone whose name matches `name`
    ///
    /// Matching ignores the trailing dot on both sides.
    async fn find_by_name(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<ResourceRecordSet>, crate::Error>;

    /// True if a record set named `name` carries exactly `value`
    async fn find_by_name_and_value(
        &self,
        zone_id: &str,
        name: &str,
        value: &str,
    ) -> Result<bool, crate::Error> {
        let sets = self.find_by_name(zone_id, name).await?;
        Ok(sets.iter().any(|set| set.value == value))
    }

    /// Submit a single create or delete change for `target`
    async fn apply(
        &self,
        zone_id: &str,
        action: ChangeAction,
        target: &RegistrationTarget,
    ) -> Result<ChangeAck, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
