//! Observed facts produced by the polling layer.
//!
//! Each fact is an immutable snapshot of something an instance reported at a
//! point in time. Facts derive serde so they can arrive as JSONL.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An instance was reachable during a polling cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceFact {
    /// Hostname of the instance.
    pub hostname: String,
}

impl InstanceFact {
    /// Creates a fact for the given hostname.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

/// A client connection reported by an instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionStatus {
    /// Peer address of the client.
    pub peer: String,
    /// Authenticated user name; absent for anonymous connections.
    #[serde(default)]
    pub user: Option<String>,
    /// When the connection was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub started: OffsetDateTime,
    /// Connection type, such as `HTTP` or `HTSP`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ConnectionStatus {
    /// Returns `true` when no user authenticated on the connection.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user.as_deref().is_none_or(str::is_empty)
    }

    /// Returns the authenticated user name, if any.
    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user.as_deref().filter(|name| !name.is_empty())
    }
}

/// Kind of a subscription as reported by the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionType {
    /// A client is streaming a channel.
    Streaming,
    /// The instance's DVR is recording a channel.
    Recording,
    /// The EPG grabber is tuned to a mux. Never persisted.
    #[serde(rename = "epggrab")]
    EpgGrab,
}

/// A subscription reported by an instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubscriptionStatus {
    /// Identifier assigned by the instance.
    pub id: u64,
    /// Kind of subscription.
    #[serde(rename = "type")]
    pub kind: SubscriptionType,
    /// User name reported with the subscription, if any.
    #[serde(default)]
    pub username: Option<String>,
    /// Channel name.
    pub channel: String,
    /// When the subscription started.
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    /// Programme title.
    #[serde(default)]
    pub title: String,
    /// Service name.
    #[serde(default)]
    pub service: String,
}

/// Transition carried by a [`StateChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// The subscription started.
    Started,
    /// The subscription stopped.
    Stopped,
}

/// A subscription started or stopped on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateChange {
    /// Identifier assigned by the instance.
    pub subscription_id: u64,
    /// Transition kind.
    pub state: SubscriptionState,
}

impl StateChange {
    /// Creates a start transition.
    #[must_use]
    pub const fn started(subscription_id: u64) -> Self {
        Self {
            subscription_id,
            state: SubscriptionState::Started,
        }
    }

    /// Creates a stop transition.
    #[must_use]
    pub const fn stopped(subscription_id: u64) -> Self {
        Self {
            subscription_id,
            state: SubscriptionState::Stopped,
        }
    }
}

/// Everything one polling cycle observed on a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceStatus {
    /// The instance that was polled.
    pub instance: InstanceFact,
    /// Connections open at poll time.
    #[serde(default)]
    pub connections: Vec<ConnectionStatus>,
    /// Subscriptions active at poll time.
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionStatus>,
}

impl InstanceStatus {
    /// Creates an empty status for the given hostname.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            instance: InstanceFact::new(hostname),
            connections: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Hostname of the polled instance.
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance.hostname
    }
}
