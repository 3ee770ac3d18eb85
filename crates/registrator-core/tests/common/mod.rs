//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal collaborators that count every call so the
//! tests can assert exactly which side effects a reconciliation had.

#![allow(dead_code)]

use registrator_core::config::{ClassifierConfig, ProviderConfig, RegistratorConfig};
use registrator_core::error::{Error, Result};
use registrator_core::store::MemoryRecordStore;
use registrator_core::traits::{
    AddressResolver, ChangeAck, ChangeAction, ContainerDescriptor, ContainerRuntime, EventStream,
    LifecycleEvent, RecordStore, RegistrationTarget, ResourceRecordSet,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const ZONE: &str = "ZTEST";
pub const LABEL: &str = "registrator.service";

/// A runtime whose event feed is driven by the test
pub struct ScriptedRuntime {
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<Result<LifecycleEvent>>>>,
    containers: Mutex<HashMap<String, ContainerDescriptor>>,
    inspect_call_count: Arc<AtomicUsize>,
}

impl ScriptedRuntime {
    /// Create a runtime and the sender feeding its event stream
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<LifecycleEvent>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Self {
            events_rx: Mutex::new(Some(rx)),
            containers: Mutex::new(HashMap::new()),
            inspect_call_count: Arc::new(AtomicUsize::new(0)),
        };
        (runtime, tx)
    }

    /// Make a container known to `inspect`
    pub fn with_container(self, descriptor: ContainerDescriptor) -> Self {
        self.containers
            .lock()
            .unwrap()
            .insert(descriptor.id.clone(), descriptor);
        self
    }

    /// Number of `inspect` calls so far
    pub fn inspect_call_count(&self) -> usize {
        self.inspect_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn events(&self) -> Result<EventStream> {
        let rx = self
            .events_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| Error::runtime("events() can only be called once"))?;
        Ok(Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx)))
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor> {
        self.inspect_call_count.fetch_add(1, Ordering::SeqCst);
        self.containers
            .lock()
            .unwrap()
            .get(container_id)
            .cloned()
            .ok_or_else(|| Error::runtime(format!("No such container: {}", container_id)))
    }

    fn runtime_name(&self) -> &'static str {
        "scripted"
    }
}

/// A resolver returning a fixed address and counting calls
pub struct CountingResolver {
    address: Option<String>,
    call_count: AtomicUsize,
}

impl CountingResolver {
    pub fn new(address: &str) -> Self {
        Self {
            address: Some(address.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// A resolver whose lookups always fail
    pub fn unreachable() -> Self {
        Self {
            address: None,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for CountingResolver {
    async fn resolve(&self) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.address
            .clone()
            .ok_or_else(|| Error::address("metadata endpoint unreachable"))
    }

    fn resolver_name(&self) -> &'static str {
        "counting"
    }
}

/// A record store wrapping [`MemoryRecordStore`] that counts calls
pub struct CountingStore {
    inner: MemoryRecordStore,
    query_count: AtomicUsize,
    applied: Mutex<Vec<(ChangeAction, RegistrationTarget)>>,
    fail_apply: bool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            query_count: AtomicUsize::new(0),
            applied: Mutex::new(Vec::new()),
            fail_apply: false,
        }
    }

    /// A store whose mutations are rejected by the "provider"
    pub fn rejecting_changes() -> Self {
        Self {
            fail_apply: true,
            ..Self::new()
        }
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }

    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn applied(&self) -> Vec<(ChangeAction, RegistrationTarget)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn apply_count(&self, action: ChangeAction) -> usize {
        self.applied()
            .iter()
            .filter(|(applied, _)| *applied == action)
            .count()
    }
}

#[async_trait::async_trait]
impl RecordStore for CountingStore {
    async fn find_by_name(&self, zone_id: &str, name: &str) -> Result<Vec<ResourceRecordSet>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_name(zone_id, name).await
    }

    async fn apply(
        &self,
        zone_id: &str,
        action: ChangeAction,
        target: &RegistrationTarget,
    ) -> Result<ChangeAck> {
        self.applied.lock().unwrap().push((action, target.clone()));
        if self.fail_apply {
            return Err(Error::provider("AccessDenied", "not authorized to change records"));
        }
        self.inner.apply(zone_id, action, target).await
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

/// Label-convention classifier used throughout the tests
pub fn label_classifier() -> ClassifierConfig {
    ClassifierConfig::Label {
        label: LABEL.to_string(),
        suffix: "-service".to_string(),
        domain: "service.discovery".to_string(),
    }
}

/// A labelled service container
pub fn service_container(id: &str, service: &str) -> ContainerDescriptor {
    ContainerDescriptor::new(id, format!("/{}", id)).with_label(LABEL, service)
}

/// A container without the identity label
pub fn plain_container(id: &str) -> ContainerDescriptor {
    ContainerDescriptor::new(id, format!("/{}", id)).with_label("maintainer", "ops")
}

/// Helper to create a minimal config for testing
pub fn minimal_config() -> RegistratorConfig {
    RegistratorConfig {
        zone_id: ZONE.to_string(),
        classifier: label_classifier(),
        provider: ProviderConfig::Memory,
        ..RegistratorConfig::default()
    }
}
