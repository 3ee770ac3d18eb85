// # Docker Container Runtime
//
// This crate provides the Docker implementation of `ContainerRuntime`.
//
// ## Event Feed
//
// Subscribes to `GET /events` filtered to `type=container`. Each message is
// mapped to a `LifecycleEvent` from its action and actor id; the
// action-to-status mapping lives in `EventStatus::from_action`.
//
// ## Connection
//
// `docker_host` accepts the same forms as `DOCKER_HOST`:
//
// - `unix:///var/run/docker.sock` (or a bare socket path)
// - `tcp://host:2375` / `http://host:2375`

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::InspectContainerOptions;
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use registrator_core::config::RuntimeConfig;
use registrator_core::traits::{
    ContainerDescriptor, ContainerRuntime, EventStatus, EventStream, LifecycleEvent,
};
use registrator_core::{Error, Result};
use std::collections::HashMap;
use tokio_stream::StreamExt;

/// Parsed form of a `DOCKER_HOST` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// Local socket path
    Socket(String),
    /// Remote daemon over plain HTTP
    Http(String),
}

impl DockerEndpoint {
    /// Parse a `DOCKER_HOST`-style address
    pub fn parse(host: &str) -> Result<Self> {
        let host = host.trim();
        if let Some(path) = host.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::config("Docker socket path cannot be empty"));
            }
            return Ok(DockerEndpoint::Socket(path.to_string()));
        }
        if host.starts_with("tcp://") || host.starts_with("http://") {
            return Ok(DockerEndpoint::Http(host.to_string()));
        }
        if host.starts_with('/') {
            return Ok(DockerEndpoint::Socket(host.to_string()));
        }
        Err(Error::config(format!(
            "Unsupported Docker host '{}' (expected unix://, tcp:// or http://)",
            host
        )))
    }
}

/// Container runtime backed by the Docker Engine API
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
    endpoint: DockerEndpoint,
}

impl DockerRuntime {
    /// Connect to the daemon named by the runtime configuration
    ///
    /// Connecting is lazy; use [`ContainerRuntime::ping`] to check the
    /// daemon is actually reachable.
    pub fn connect(config: &RuntimeConfig) -> Result<Self> {
        let endpoint = DockerEndpoint::parse(&config.docker_host)?;
        let docker = match &endpoint {
            DockerEndpoint::Socket(path) => {
                Docker::connect_with_socket(path, config.timeout_secs, bollard::API_DEFAULT_VERSION)
            }
            DockerEndpoint::Http(addr) => {
                Docker::connect_with_http(addr, config.timeout_secs, bollard::API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| Error::runtime(format!("Failed to connect to Docker: {}", e)))?;

        tracing::debug!(endpoint = ?endpoint, "Docker client configured");
        Ok(Self { docker, endpoint })
    }

    /// Endpoint this runtime talks to
    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| Error::runtime(format!("Docker daemon unreachable: {}", e)))?;
        Ok(())
    }

    async fn events(&self) -> Result<EventStream> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);

        let options = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        let stream = self.docker.events(Some(options)).map(|message| match message {
            Ok(message) => lifecycle_event_from(message),
            Err(e) => Err(Error::runtime(format!("Docker event stream error: {}", e))),
        });

        tracing::info!("Subscribed to Docker container events");
        Ok(Box::pin(stream))
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor> {
        let response = self
            .docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| {
                Error::runtime(format!("Failed to inspect container {}: {}", container_id, e))
            })?;

        Ok(descriptor_from(container_id, response))
    }

    fn runtime_name(&self) -> &'static str {
        "docker"
    }
}

fn lifecycle_event_from(message: EventMessage) -> Result<LifecycleEvent> {
    let action = message.action.unwrap_or_default();
    let container_id = message
        .actor
        .and_then(|actor| actor.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            Error::runtime(format!("Docker event '{}' carried no container id", action))
        })?;

    Ok(LifecycleEvent::new(container_id, EventStatus::from_action(&action)))
}

fn descriptor_from(requested_id: &str, response: ContainerInspectResponse) -> ContainerDescriptor {
    let id = response.id.unwrap_or_else(|| requested_id.to_string());
    let name = response.name.unwrap_or_default();
    let labels = response
        .config
        .and_then(|config| config.labels)
        .unwrap_or_default();

    ContainerDescriptor { id, name, labels }
}
