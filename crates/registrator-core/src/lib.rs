// # registrator-core
//
// Core library keeping a DNS zone in sync with container lifecycle events.
//
// ## Architecture Overview
//
// - **ContainerRuntime**: Trait for the lifecycle event feed and container inspection
// - **AddressResolver**: Trait for resolving this host's registrable address
// - **RecordStore**: Trait for querying and mutating the DNS zone
// - **Classifier**: Decides whether a container is observed and its record name
// - **Reconciler**: Turns one event into at most one zone mutation
// - **RegistratorEngine**: Drains the event feed and drives the reconciler
//
// ## Design Principles
//
// 1. **Zone is the source of truth**: existence is queried before every mutation
// 2. **Idempotent transitions**: duplicate start/stop events are no-ops
// 3. **One event at a time**: a single consumer reconciles in delivery order
// 4. **Library-first**: collaborators are traits, the daemon only wires them

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use classifier::{Classification, Classifier};
pub use config::{ClassifierConfig, ProviderConfig, RecordConfig, RegistratorConfig};
pub use engine::{EngineEvent, RegistratorEngine};
pub use error::{Error, Result};
pub use reconciler::{Outcome, Reconciliation, Reconciler};
pub use store::MemoryRecordStore;
pub use traits::{
    AddressResolver, ChangeAction, ContainerDescriptor, ContainerRuntime, EventStatus,
    LifecycleEvent, RecordStore, RegistrationTarget, ResourceRecordSet,
};
