//! Core traits for the registrator
//!
//! This module defines the abstract interfaces of the external collaborators.
//!
//! - [`ContainerRuntime`]: Lifecycle event feed and container inspection
//! - [`AddressResolver`]: This host's registrable address
//! - [`RecordStore`]: Query and mutate the DNS zone

pub mod address_resolver;
pub mod container_runtime;
pub mod record_store;

pub use address_resolver::AddressResolver;
pub use container_runtime::{
    ContainerDescriptor, ContainerRuntime, EventStatus, EventStream, LifecycleEvent,
};
pub use record_store::{
    ChangeAck, ChangeAction, RecordStore, RecordType, RegistrationTarget, ResourceRecordSet,
    fqdn, names_match,
};
