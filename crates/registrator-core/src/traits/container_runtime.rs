// # Container Runtime Trait
//
// Defines the interface to the container runtime: the lifecycle event feed
// and on-demand container inspection.
//
// ## Implementations
//
// - Docker Engine API: `registrator-runtime-docker` crate
//
// ## Usage
//
// ```rust,ignore
// use registrator_core::ContainerRuntime;
// use tokio_stream::StreamExt;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let runtime = /* ContainerRuntime implementation */;
//
//     let mut events = runtime.events().await?;
//     while let Some(event) = events.next().await {
//         let event = event?;
//         let descriptor = runtime.inspect(&event.container_id).await?;
//         println!("{:?} {:?}", event.status, descriptor.labels);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use tokio_stream::Stream;

/// Lifecycle status carried by a runtime event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// The container started
    Start,
    /// The container terminated (stop, die or kill)
    Stop,
    /// Any other runtime status
    Other,
}

impl EventStatus {
    /// Map a raw runtime action to a status
    ///
    /// Every terminal action maps to [`EventStatus::Stop`]: the runtime may
    /// emit several of them for one termination. Anything unrecognised,
    /// including actions with a detail suffix such as `exec_start: sh`,
    /// falls through to [`EventStatus::Other`].
    pub fn from_action(action: &str) -> Self {
        match action {
            "start" => EventStatus::Start,
            "stop" | "die" | "kill" => EventStatus::Stop,
            _ => EventStatus::Other,
        }
    }
}

/// A container lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Runtime identifier of the container
    pub container_id: String,
    /// Lifecycle status
    pub status: EventStatus,
}

impl LifecycleEvent {
    /// Create a new lifecycle event
    pub fn new(container_id: impl Into<String>, status: EventStatus) -> Self {
        Self {
            container_id: container_id.into(),
            status,
        }
    }
}

/// Container metadata fetched at event time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDescriptor {
    /// Runtime identifier of the container
    pub id: String,
    /// Container name as reported by the runtime (usually `/name`)
    pub name: String,
    /// Container labels
    pub labels: HashMap<String, String>,
}

impl ContainerDescriptor {
    /// Create a descriptor without labels
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            labels: HashMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Stream of lifecycle events; items are errors when the feed hiccups
pub type EventStream = Pin<Box<dyn Stream<Item = crate::Result<LifecycleEvent>> + Send + 'static>>;

/// Trait for container runtime implementations
///
/// # Ordering
///
/// The stream returned by [`ContainerRuntime::events`] must yield events
/// in the order the runtime delivered them. The engine is its only
/// consumer.
///
/// # Failure
///
/// `ping` and `events` failures are fatal at startup. `inspect` failures
/// only fail the event being processed.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the runtime is reachable
    async fn ping(&self) -> Result<(), crate::Error>;

    /// Subscribe to the lifecycle event feed
    async fn events(&self) -> Result<EventStream, crate::Error>;

    /// Fetch the current descriptor of a container
    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor, crate::Error>;

    /// Get the runtime name (for logging/debugging)
    fn runtime_name(&self) -> &'static str;
}
