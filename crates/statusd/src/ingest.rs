//! Application of polled instance state through the correlation engine.
//!
//! Each polling cycle yields one [`InstanceStatus`] per reachable instance.
//! [`StatusIngestor`] persists the facts of every instance in turn and then
//! announces the completed cycle on the [`EventBus`]. A failing instance does
//! not stop the cycle; its error is logged and returned with the others.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{Event, EventBus};
use crate::message::Request;
use crate::persistence::{InstanceStatus, PersistenceManager, StateChange, StoreError};

/// Tracing target for ingestion.
pub(crate) const INGEST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::ingest");

/// Failure to persist the status of one instance.
#[derive(Debug, Error)]
#[error("failed to ingest status of {instance_name}: {source}")]
pub struct IngestError {
    /// Instance whose facts could not be persisted.
    pub instance_name: String,
    /// Underlying store failure.
    #[source]
    pub source: StoreError,
}

/// One line of the observation feed.
///
/// ```json
/// {"kind":"cycle","instances":[{"instance":{"hostname":"tvh"},"connections":[],"subscriptions":[]}]}
/// {"kind":"state_change","instance_name":"tvh","change":{"subscription_id":7,"state":"stopped"}}
/// {"kind":"request","request":{"type":"instances"}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// A completed polling cycle.
    Cycle {
        /// Status of every polled instance.
        instances: Vec<InstanceStatus>,
    },
    /// A subscription started or stopped.
    StateChange {
        /// Instance the subscription belongs to.
        instance_name: String,
        /// The transition.
        change: StateChange,
    },
    /// A client query arriving on the same feed.
    Request {
        /// The query.
        request: Request,
    },
}

impl Observation {
    /// Parses one feed line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns the serde error for a line that is not a valid observation.
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }
}

/// Drives the correlation engine with polled state and publishes the
/// matching events.
pub struct StatusIngestor {
    manager: PersistenceManager,
    bus: Arc<EventBus>,
}

impl StatusIngestor {
    /// Creates an ingestor writing through `manager` and publishing on `bus`.
    pub fn new(manager: PersistenceManager, bus: Arc<EventBus>) -> Self {
        Self { manager, bus }
    }

    /// Persists one polling cycle and publishes
    /// [`EventName::InstanceStatusUpdates`](crate::events::EventName) once
    /// every instance has been processed.
    ///
    /// Returns the instances that failed. The remaining instances are
    /// processed regardless.
    pub fn ingest_cycle(&self, statuses: &[InstanceStatus]) -> Vec<IngestError> {
        let mut failures = Vec::new();
        for status in statuses {
            if let Err(source) = self.ingest_instance(status) {
                warn!(
                    target: INGEST_TARGET,
                    event = "instance_failed",
                    instance = status.instance_name(),
                    error = %source,
                    "failed to ingest instance status"
                );
                failures.push(IngestError {
                    instance_name: status.instance_name().to_owned(),
                    source,
                });
            }
        }

        debug!(
            target: INGEST_TARGET,
            event = "cycle_ingested",
            instances = statuses.len(),
            failures = failures.len(),
            "ingested polling cycle"
        );
        self.bus
            .publish(&Event::InstanceStatusUpdates(statuses.to_vec()));
        failures
    }

    /// Applies a subscription state change and publishes it.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the engine. Nothing is published when
    /// the change could not be applied.
    pub fn apply_state_change(
        &self,
        instance_name: &str,
        change: &StateChange,
    ) -> Result<(), StoreError> {
        self.manager
            .on_subscription_state_change(instance_name, change)?;
        self.bus.publish(&Event::SubscriptionStateChange {
            instance_name: instance_name.to_owned(),
            change: *change,
        });
        Ok(())
    }

    fn ingest_instance(&self, status: &InstanceStatus) -> Result<(), StoreError> {
        let instance_name = status.instance_name();

        self.manager.on_instance_seen(&status.instance)?;
        self.bus.publish(&Event::InstanceSeen(status.instance.clone()));

        for connection in &status.connections {
            self.manager.on_connection_seen(instance_name, connection)?;
            self.bus.publish(&Event::ConnectionSeen {
                instance_name: instance_name.to_owned(),
                status: connection.clone(),
            });
        }

        for subscription in &status.subscriptions {
            self.manager
                .on_subscription_seen(instance_name, subscription)?;
            self.bus.publish(&Event::SubscriptionSeen {
                instance_name: instance_name.to_owned(),
                status: subscription.clone(),
            });
        }
        Ok(())
    }
}
