//! Notification names and the in-process bus that delivers them.
//!
//! Every notification the daemon emits has a stable dotted name drawn from
//! the closed [`EventName`] set. Listeners subscribe to a name while the
//! daemon is being assembled. Publishing is synchronous and delivers to the
//! listeners of that name in the order they subscribed.

use std::collections::HashMap;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::persistence::{
    ConnectionStatus, InstanceFact, InstanceStatus, StateChange, SubscriptionStatus,
};

/// Tracing target for event delivery.
pub(crate) const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

/// Closed set of notification names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
pub enum EventName {
    /// A polling cycle finished for every instance.
    #[strum(serialize = "status.instanceUpdates")]
    InstanceStatusUpdates,
    /// An instance was reachable.
    #[strum(serialize = "persistence.instanceSeen")]
    InstanceSeen,
    /// A connection was observed on an instance.
    #[strum(serialize = "persistence.connectionSeen")]
    ConnectionSeen,
    /// A subscription was observed on an instance.
    #[strum(serialize = "persistence.subscriptionSeen")]
    SubscriptionSeen,
    /// A subscription started or stopped.
    #[strum(serialize = "persistence.subscriptionStateChange")]
    SubscriptionStateChange,
}

impl EventName {
    /// Returns the stable dotted name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A notification together with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Every instance status gathered in one polling cycle.
    InstanceStatusUpdates(Vec<InstanceStatus>),
    /// An instance was seen.
    InstanceSeen(InstanceFact),
    /// A connection was seen on an instance.
    ConnectionSeen {
        /// Instance hostname.
        instance_name: String,
        /// The observed connection.
        status: ConnectionStatus,
    },
    /// A subscription was seen on an instance.
    SubscriptionSeen {
        /// Instance hostname.
        instance_name: String,
        /// The observed subscription.
        status: SubscriptionStatus,
    },
    /// A subscription changed state on an instance.
    SubscriptionStateChange {
        /// Instance hostname.
        instance_name: String,
        /// The transition.
        change: StateChange,
    },
}

impl Event {
    /// Returns the name this event is published under.
    #[must_use]
    pub fn name(&self) -> EventName {
        match self {
            Self::InstanceStatusUpdates(_) => EventName::InstanceStatusUpdates,
            Self::InstanceSeen(_) => EventName::InstanceSeen,
            Self::ConnectionSeen { .. } => EventName::ConnectionSeen,
            Self::SubscriptionSeen { .. } => EventName::SubscriptionSeen,
            Self::SubscriptionStateChange { .. } => EventName::SubscriptionStateChange,
        }
    }
}

/// Receives published events.
pub trait EventListener: Send + Sync {
    /// Handles one event. Listeners must not block for long; delivery is
    /// synchronous.
    fn on_event(&self, event: &Event);
}

/// Synchronous fan-out of events to listeners registered per name.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<EventName, Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    /// Creates a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for events published under `name`.
    pub fn subscribe(&mut self, name: EventName, listener: Arc<dyn EventListener>) {
        self.listeners.entry(name).or_default().push(listener);
    }

    /// Number of listeners registered for `name`.
    #[must_use]
    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.get(&name).map_or(0, Vec::len)
    }

    /// Delivers `event` to every listener of its name and returns how many
    /// listeners received it.
    pub fn publish(&self, event: &Event) -> usize {
        let name = event.name();
        let listeners = self.listeners.get(&name).map_or(&[][..], Vec::as_slice);
        tracing::trace!(
            target: EVENTS_TARGET,
            event = name.as_str(),
            listeners = listeners.len(),
            "publishing event"
        );
        for listener in listeners {
            listener.on_event(event);
        }
        listeners.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        names.sort_unstable();
        f.debug_struct("EventBus").field("listeners", &names).finish()
    }
}
