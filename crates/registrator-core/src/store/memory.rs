// # Memory Record Store
//
// In-memory implementation of RecordStore.
//
// ## Purpose
//
// Holds zones in process memory with the same matching and rejection rules
// as a hosted provider:
//
// - Names match regardless of the trailing dot
// - Creating a set whose (name, set identifier) already exists is rejected
// - Deleting a set that does not exist is rejected
//
// ## When to Use
//
// - Testing environments
// - Local trials of a classifier convention without touching a real zone

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::config::RecordConfig;
use crate::traits::{
    ChangeAck, ChangeAction, RecordStore, RegistrationTarget, ResourceRecordSet, names_match,
};

/// In-memory record store implementation
///
/// Zones are keyed by zone id; each holds a flat list of record sets.
///
/// # Example
///
/// ```rust,no_run
/// use registrator_core::store::MemoryRecordStore;
/// use registrator_core::traits::{ChangeAction, RecordStore, RegistrationTarget};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRecordStore::new();
///     let target = RegistrationTarget::new("web.service.discovery", "10.0.0.5");
///
///     store.apply("Z1", ChangeAction::Create, &target).await?;
///     assert!(store.find_by_name_and_value("Z1", "web.service.discovery", "10.0.0.5").await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    zones: Arc<RwLock<HashMap<String, Vec<ResourceRecordSet>>>>,
    record: RecordConfig,
    change_counter: Arc<AtomicU64>,
}

impl MemoryRecordStore {
    /// Create a new empty store writing default-shaped record sets
    pub fn new() -> Self {
        Self::with_record_config(RecordConfig::default())
    }

    /// Create a new empty store writing record sets shaped by `record`
    pub fn with_record_config(record: RecordConfig) -> Self {
        Self {
            zones: Arc::new(RwLock::new(HashMap::new())),
            record,
            change_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seed a record set directly, bypassing change validation
    pub async fn insert(&self, zone_id: &str, set: ResourceRecordSet) {
        let mut guard = self.zones.write().await;
        guard.entry(zone_id.to_string()).or_default().push(set);
    }

    /// All record sets in a zone
    pub async fn records(&self, zone_id: &str) -> Vec<ResourceRecordSet> {
        let guard = self.zones.read().await;
        guard.get(zone_id).cloned().unwrap_or_default()
    }

    /// Number of record sets in a zone
    pub async fn len(&self, zone_id: &str) -> usize {
        let guard = self.zones.read().await;
        guard.get(zone_id).map(Vec::len).unwrap_or(0)
    }

    /// Check if a zone holds no record sets
    pub async fn is_empty(&self, zone_id: &str) -> bool {
        self.len(zone_id).await == 0
    }

    fn next_ack(&self) -> ChangeAck {
        let n = self.change_counter.fetch_add(1, Ordering::SeqCst) + 1;
        ChangeAck {
            id: format!("/change/MEMORY{n:08}"),
            status: "INSYNC".to_string(),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn same_set(a: &ResourceRecordSet, b: &ResourceRecordSet) -> bool {
    names_match(&a.name, &b.name) && a.set_identifier == b.set_identifier
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_by_name(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<ResourceRecordSet>, Error> {
        let guard = self.zones.read().await;
        Ok(guard
            .get(zone_id)
            .map(|sets| {
                sets.iter()
                    .filter(|set| names_match(&set.name, name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn apply(
        &self,
        zone_id: &str,
        action: ChangeAction,
        target: &RegistrationTarget,
    ) -> Result<ChangeAck, Error> {
        let set = ResourceRecordSet::for_target(target, &self.record);
        let mut guard = self.zones.write().await;
        let sets = guard.entry(zone_id.to_string()).or_default();

        match action {
            ChangeAction::Create => {
                if sets.iter().any(|existing| same_set(existing, &set)) {
                    return Err(Error::provider(
                        "InvalidChangeBatch",
                        format!(
                            "Tried to create resource record set {} type {}, but it already exists",
                            set.name, set.record_type
                        ),
                    ));
                }
                sets.push(set);
            }
            ChangeAction::Delete => {
                let Some(index) = sets
                    .iter()
                    .position(|existing| same_set(existing, &set) && existing.value == set.value)
                else {
                    return Err(Error::provider(
                        "InvalidChangeBatch",
                        format!(
                            "Tried to delete resource record set {} type {}, but it was not found",
                            set.name, set.record_type
                        ),
                    ));
                };
                sets.remove(index);
            }
        }

        Ok(self.next_ack())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecordType;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn create_then_query_round_trip() {
        let store = MemoryRecordStore::new();
        let target = RegistrationTarget::new("svc.example.com", "10.0.0.1");

        assert!(store.is_empty("Z1").await);
        assert_ok!(store.apply("Z1", ChangeAction::Create, &target).await);
        assert!(assert_ok!(
            store.find_by_name_and_value("Z1", "svc.example.com", "10.0.0.1").await
        ));

        assert_ok!(store.apply("Z1", ChangeAction::Delete, &target).await);
        assert!(!assert_ok!(
            store.find_by_name_and_value("Z1", "svc.example.com", "10.0.0.1").await
        ));
        assert!(store.is_empty("Z1").await);
    }

    #[tokio::test]
    async fn find_by_name_ignores_trailing_dot() {
        let store = MemoryRecordStore::new();
        store
            .insert(
                "Z1",
                ResourceRecordSet {
                    name: "svc.example.com.".to_string(),
                    record_type: RecordType::A,
                    value: "10.0.0.1".to_string(),
                    set_identifier: Some("10.0.0.1".to_string()),
                    weight: Some(50),
                    ttl: Some(5),
                },
            )
            .await;

        assert_eq!(store.find_by_name("Z1", "svc.example.com").await.unwrap().len(), 1);
        assert_eq!(store.find_by_name("Z1", "svc.example.com.").await.unwrap().len(), 1);
        assert!(store.find_by_name("Z1", "other.example.com").await.unwrap().is_empty());
        assert!(store.find_by_name("Z2", "svc.example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn value_match_is_exact() {
        let store = MemoryRecordStore::new();
        let target = RegistrationTarget::new("svc.example.com", "10.0.0.1");
        store.apply("Z1", ChangeAction::Create, &target).await.unwrap();

        assert!(!store
            .find_by_name_and_value("Z1", "svc.example.com", "10.0.0.2")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn hosts_coexist_under_one_name() {
        let store = MemoryRecordStore::new();
        let a = RegistrationTarget::new("svc.example.com", "10.0.0.1");
        let b = RegistrationTarget::new("svc.example.com", "10.0.0.2");

        store.apply("Z1", ChangeAction::Create, &a).await.unwrap();
        store.apply("Z1", ChangeAction::Create, &b).await.unwrap();

        assert_eq!(store.find_by_name("Z1", "svc.example.com").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn written_sets_follow_record_config() {
        let store = MemoryRecordStore::with_record_config(RecordConfig {
            ttl: 60,
            weight: 10,
            ..RecordConfig::default()
        });
        let target = RegistrationTarget::new("svc.example.com", "10.0.0.1");

        store.apply("Z1", ChangeAction::Create, &target).await.unwrap();

        let records = store.records("Z1").await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "svc.example.com.");
        assert_eq!(records[0].record_type, RecordType::A);
        assert_eq!(records[0].set_identifier.as_deref(), Some("10.0.0.1"));
        assert_eq!(records[0].weight, Some(10));
        assert_eq!(records[0].ttl, Some(60));
        assert!(store.records("Z2").await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_create_and_missing_delete_are_provider_errors() {
        let store = MemoryRecordStore::new();
        let target = RegistrationTarget::new("svc.example.com", "10.0.0.1");

        store.apply("Z1", ChangeAction::Create, &target).await.unwrap();
        let err = store
            .apply("Z1", ChangeAction::Create, &target)
            .await
            .unwrap_err();
        assert!(err.is_provider_error());

        let other = RegistrationTarget::new("svc.example.com", "10.0.0.9");
        let err = store
            .apply("Z1", ChangeAction::Delete, &other)
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
    }

    #[tokio::test]
    async fn change_ids_are_unique() {
        let store = MemoryRecordStore::new();
        let a = store
            .apply("Z1", ChangeAction::Create, &RegistrationTarget::new("a.example.com", "h1"))
            .await
            .unwrap();
        let b = store
            .apply("Z1", ChangeAction::Create, &RegistrationTarget::new("b.example.com", "h1"))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
    }
}
