//! Reconciliation of one lifecycle event against the DNS zone
//!
//! The reconciler turns a lifecycle event plus the container's descriptor
//! into at most one zone mutation:
//!
//! ```text
//!              Create (Start, absent)
//!   Absent ─────────────────────────────▶ Present
//!     ▲                                     │
//!     └─────────────────────────────────────┘
//!              Delete (Stop, present)
//! ```
//!
//! `Create` on a present record and `Delete` on an absent one are no-ops
//! (`AlreadyExists` / `NotFound`). The zone is queried immediately before
//! every mutation; nothing is cached between events.
//!
//! Two processes reconciling the same target at the same moment can still
//! both see "absent" and both create. The existence check is the only guard.
//!
//! The reconciler never logs its decisions. It returns a [`Reconciliation`]
//! and leaves observability to the caller.

use std::fmt;
use std::sync::Arc;

use crate::classifier::Classifier;
use crate::traits::{
    AddressResolver, ChangeAction, ContainerDescriptor, EventStatus, LifecycleEvent, RecordStore,
    RegistrationTarget,
};

/// Terminal state of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record was absent and has been created
    Created,
    /// The record was already present; nothing was changed
    AlreadyExists,
    /// The record was present and has been deleted
    Deleted,
    /// The record was already absent; nothing was changed
    NotFound,
    /// The event or container is not of interest
    Skipped,
    /// A collaborator failed; the zone is unchanged by this event
    Failed(String),
}

impl Outcome {
    /// True for [`Outcome::Failed`]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// True if the zone was mutated
    pub fn is_mutation(&self) -> bool {
        matches!(self, Outcome::Created | Outcome::Deleted)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => f.write_str("created"),
            Outcome::AlreadyExists => f.write_str("already exists"),
            Outcome::Deleted => f.write_str("deleted"),
            Outcome::NotFound => f.write_str("not found"),
            Outcome::Skipped => f.write_str("skipped"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Everything the caller needs to report on one reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Container the event was about
    pub container_id: String,
    /// Event status that triggered the reconciliation
    pub status: EventStatus,
    /// Target acted on, once it could be built
    pub target: Option<RegistrationTarget>,
    /// Mutation the reconciler went on to perform (set once a target
    /// needed changing, even if the change then failed)
    pub action: Option<ChangeAction>,
    /// Terminal state
    pub outcome: Outcome,
}

impl Reconciliation {
    /// A reconciliation that ends before a target exists
    pub fn early(event: &LifecycleEvent, outcome: Outcome) -> Self {
        Self {
            container_id: event.container_id.clone(),
            status: event.status,
            target: None,
            action: None,
            outcome,
        }
    }
}

/// Applies lifecycle events to the zone
pub struct Reconciler {
    classifier: Classifier,
    resolver: Arc<dyn AddressResolver>,
    store: Arc<dyn RecordStore>,
    zone_id: String,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(
        classifier: Classifier,
        resolver: Arc<dyn AddressResolver>,
        store: Arc<dyn RecordStore>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            resolver,
            store,
            zone_id: zone_id.into(),
        }
    }

    /// Hosted zone this reconciler writes to
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Classifier in use
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Reconcile one event
    ///
    /// Statuses other than start/stop are skipped before anything else
    /// happens. Out-of-scope containers are skipped without any
    /// collaborator call.
    pub async fn reconcile(
        &self,
        event: &LifecycleEvent,
        descriptor: &ContainerDescriptor,
    ) -> Reconciliation {
        if event.status == EventStatus::Other {
            return Reconciliation::early(event, Outcome::Skipped);
        }

        let classification = self.classifier.classify(descriptor);
        let record_name = match classification.record_name {
            Some(name) if classification.in_scope => name,
            _ => return Reconciliation::early(event, Outcome::Skipped),
        };

        let value = match self.resolver.resolve().await {
            Ok(value) => value,
            Err(e) => {
                return Reconciliation::early(
                    event,
                    Outcome::Failed(format!(
                        "cannot resolve host address for {}: {}",
                        record_name, e
                    )),
                );
            }
        };

        let target = RegistrationTarget::new(&record_name, value);
        self.converge(event, target).await
    }

    /// Delete this host's record for the statically configured name
    ///
    /// Returns `None` when the classifier has no fixed record name. Used at
    /// startup to clear a registration left behind by a previous process.
    pub async fn purge_stale(&self) -> Option<Reconciliation> {
        let crate::config::ClassifierConfig::ContainerName {
            container,
            record_name,
        } = self.classifier.config()
        else {
            return None;
        };

        let event = LifecycleEvent::new(container.clone(), EventStatus::Stop);
        let value = match self.resolver.resolve().await {
            Ok(value) => value,
            Err(e) => {
                return Some(Reconciliation::early(
                    &event,
                    Outcome::Failed(format!(
                        "cannot resolve host address for {}: {}",
                        record_name, e
                    )),
                ));
            }
        };

        Some(
            self.converge(&event, RegistrationTarget::new(record_name, value))
                .await,
        )
    }

    async fn converge(&self, event: &LifecycleEvent, target: RegistrationTarget) -> Reconciliation {
        let action = match event.status {
            EventStatus::Start => ChangeAction::Create,
            EventStatus::Stop => ChangeAction::Delete,
            EventStatus::Other => return Reconciliation::early(event, Outcome::Skipped),
        };

        let outcome = self.converge_target(action, &target).await;
        let attempted = match outcome {
            Outcome::Created | Outcome::Deleted | Outcome::Failed(_) => Some(action),
            _ => None,
        };

        Reconciliation {
            container_id: event.container_id.clone(),
            status: event.status,
            target: Some(target),
            action: attempted,
            outcome,
        }
    }

    async fn converge_target(&self, action: ChangeAction, target: &RegistrationTarget) -> Outcome {
        let exists = match self
            .store
            .find_by_name_and_value(&self.zone_id, target.record_name(), target.value())
            .await
        {
            Ok(exists) => exists,
            Err(e) => {
                return Outcome::Failed(format!("existence check for {} failed: {}", target, e));
            }
        };

        match (action, exists) {
            (ChangeAction::Create, true) => Outcome::AlreadyExists,
            (ChangeAction::Delete, false) => Outcome::NotFound,
            (action, _) => match self.store.apply(&self.zone_id, action, target).await {
                Ok(_) if action == ChangeAction::Create => Outcome::Created,
                Ok(_) => Outcome::Deleted,
                Err(e) => Outcome::Failed(format!("{} of {} failed: {}", action, target, e)),
            },
        }
    }
}
