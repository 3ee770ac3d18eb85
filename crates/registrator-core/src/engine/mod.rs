//! Core registrator engine
//!
//! The RegistratorEngine is responsible for:
//! - Subscribing to the container runtime's lifecycle events
//! - Fetching the current descriptor of each event's container
//! - Driving the Reconciler, one event at a time, in delivery order
//! - Logging every outcome and publishing it to observers
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ ContainerRuntime │─── LifecycleEvent ───┐
//! └──────────────────┘                      │
//!          ▲                                ▼
//!          │ inspect             ┌────────────────────┐
//!          └─────────────────────│ RegistratorEngine  │
//!                                └────────────────────┘
//!                                           │
//!                                           ▼
//!                                  ┌────────────────┐
//!                                  │   Reconciler   │
//!                                  └────────────────┘
//!                                           │
//!                   ┌───────────────────────┼──────────────────────┐
//!                   ▼                       ▼                      ▼
//!          ┌─────────────────┐     ┌────────────────┐      ┌─────────────┐
//!          │ AddressResolver │     │  RecordStore   │      │   Events    │
//!          │ (resolve)       │     │ (query/apply)  │      │  (notify)   │
//!          └─────────────────┘     └────────────────┘      └─────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Lifecycle event dequeued
//! 2. Non start/stop statuses are skipped without inspection
//! 3. Container inspected (failure fails this event only)
//! 4. Reconciler classifies, resolves, checks existence, mutates
//! 5. Outcome logged and emitted
//!
//! Nothing is retried. There is no drain on shutdown: an event dequeued when
//! the process dies may be lost.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::config::RegistratorConfig;
use crate::error::{Error, Result};
use crate::reconciler::{Outcome, Reconciliation, Reconciler};
use crate::traits::{AddressResolver, ContainerRuntime, EventStatus, LifecycleEvent, RecordStore};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the RegistratorEngine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Engine subscribed to the runtime
    Started {
        zone_id: String,
        classifier: &'static str,
    },

    /// Startup purge finished
    Purged(Reconciliation),

    /// One lifecycle event was reconciled
    Reconciled(Reconciliation),

    /// The runtime event feed yielded an error
    StreamError { error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Core registrator engine
///
/// ## Lifecycle
///
/// 1. Create with [`RegistratorEngine::new()`]
/// 2. Start with [`RegistratorEngine::run()`]
/// 3. Engine runs until the event feed ends or the process exits
///
/// ## Threading
///
/// The engine is the single consumer of the event feed. Reconciliation of
/// one event finishes before the next is dequeued, so two events for the
/// same container never overlap within one process.
pub struct RegistratorEngine {
    /// Source of lifecycle events and descriptors
    runtime: Arc<dyn ContainerRuntime>,

    /// Per-event decision logic
    reconciler: Reconciler,

    /// Delete this host's stale record before subscribing
    purge_on_start: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl RegistratorEngine {
    /// Create a new registrator engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        resolver: Arc<dyn AddressResolver>,
        store: Arc<dyn RecordStore>,
        config: RegistratorConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Reconciler::new(
            Classifier::new(config.classifier),
            resolver,
            store,
            config.zone_id,
        );

        let engine = Self {
            runtime,
            reconciler,
            purge_on_start: config.engine.purge_on_start,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until the event feed ends
    ///
    /// # Returns
    ///
    /// - `Err(Error)`: The subscription could not be established or was lost
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine with a controlled shutdown signal
    ///
    /// Stops dequeuing once the signal fires (or its sender is dropped). The
    /// event being reconciled at that moment is finished first.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, mut shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        if self.purge_on_start {
            if let Some(purge) = self.reconciler.purge_stale().await {
                log_reconciliation(&purge);
                self.emit_event(EngineEvent::Purged(purge));
            }
        }

        let mut events = self.runtime.events().await?;
        info!(
            "Listening for {} events (zone {}, classifier {})",
            self.runtime.runtime_name(),
            self.reconciler.zone_id(),
            self.reconciler.classifier().config().mode_name()
        );
        self.emit_event(EngineEvent::Started {
            zone_id: self.reconciler.zone_id().to_string(),
            classifier: self.reconciler.classifier().config().mode_name(),
        });

        loop {
            let next = match shutdown_rx.as_mut() {
                Some(rx) => tokio::select! {
                    item = events.next() => item,
                    _ = rx => {
                        info!("Shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "Shutdown signal".to_string(),
                        });
                        return Ok(());
                    }
                },
                None => events.next().await,
            };

            match next {
                Some(Ok(event)) => {
                    let reconciliation = self.handle_event(&event).await;
                    log_reconciliation(&reconciliation);
                    self.emit_event(EngineEvent::Reconciled(reconciliation));
                }
                Some(Err(e)) => {
                    warn!("Event feed error: {}", e);
                    self.emit_event(EngineEvent::StreamError {
                        error: e.to_string(),
                    });
                }
                None => {
                    error!("Event feed from {} ended", self.runtime.runtime_name());
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Event feed ended".to_string(),
                    });
                    return Err(Error::runtime("event feed ended"));
                }
            }
        }
    }

    /// Reconcile a single lifecycle event
    ///
    /// Inspection is skipped for statuses the reconciler ignores anyway.
    pub async fn handle_event(&self, event: &LifecycleEvent) -> Reconciliation {
        if event.status == EventStatus::Other {
            return Reconciliation::early(event, Outcome::Skipped);
        }

        match self.runtime.inspect(&event.container_id).await {
            Ok(descriptor) => self.reconciler.reconcile(event, &descriptor).await,
            Err(e) => Reconciliation::early(
                event,
                Outcome::Failed(format!("cannot inspect container: {}", e)),
            ),
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping engine event. \
                Consider increasing event_channel_capacity."
            );
        }
    }
}

/// Log a reconciliation at a level matching its outcome
pub fn log_reconciliation(r: &Reconciliation) {
    let record_name = r.target.as_ref().map(|t| t.record_name()).unwrap_or("-");
    let value = r.target.as_ref().map(|t| t.value()).unwrap_or("-");
    let action = r.action.map(|a| a.as_str()).unwrap_or("-");

    match &r.outcome {
        Outcome::Created | Outcome::Deleted => info!(
            container_id = %r.container_id,
            record_name,
            value,
            action,
            "Record {}",
            r.outcome
        ),
        Outcome::AlreadyExists | Outcome::NotFound => info!(
            container_id = %r.container_id,
            record_name,
            value,
            "Record {}, nothing to do",
            r.outcome
        ),
        Outcome::Skipped => debug!(
            container_id = %r.container_id,
            status = ?r.status,
            "Event skipped"
        ),
        Outcome::Failed(reason) => error!(
            container_id = %r.container_id,
            status = ?r.status,
            record_name,
            value,
            action,
            "Reconciliation failed: {}",
            reason
        ),
    }
}
