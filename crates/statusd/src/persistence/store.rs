//! Entity records and the storage contract consumed by the correlation engine.
//!
//! The engine never talks to a database directly. It depends on
//! [`EntityStore`], which exposes the existence checks and inserts for the
//! five entity kinds the daemon persists: instances, users, channels,
//! connections and subscriptions.

use std::fmt;

use strum::{Display, EnumString};
use thiserror::Error;
use time::OffsetDateTime;

/// Name of the synthetic user that recording subscriptions are attributed to.
pub const DVR_USER_NAME: &str = "dvr";

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

record_id!(
    /// Surrogate key of a stored user.
    UserId
);
record_id!(
    /// Surrogate key of a stored channel.
    ChannelId
);
record_id!(
    /// Surrogate key of a stored connection.
    ConnectionId
);
record_id!(
    /// Surrogate key of a stored subscription.
    SubscriptionPk
);

/// Entity kinds persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    /// A tracked media-server instance.
    Instance,
    /// A user of an instance.
    User,
    /// A channel of an instance.
    Channel,
    /// A client connection to an instance.
    Connection,
    /// A viewing or recording subscription.
    Subscription,
}

/// A tracked media-server instance, keyed by hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Hostname of the instance. Doubles as the primary key.
    pub name: String,
}

/// A user of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Surrogate key.
    pub id: UserId,
    /// Owning instance.
    pub instance_name: String,
    /// User name, unique per instance.
    pub name: String,
}

impl User {
    /// Returns `true` for the synthetic user recordings are attributed to.
    #[must_use]
    pub fn is_dvr(&self) -> bool {
        self.name == DVR_USER_NAME
    }
}

/// A channel of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Surrogate key.
    pub id: ChannelId,
    /// Owning instance.
    pub instance_name: String,
    /// Channel name, unique per instance.
    pub name: String,
}

/// A client connection. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Surrogate key.
    pub id: ConnectionId,
    /// Owning instance.
    pub instance_name: String,
    /// Peer address of the client.
    pub peer: String,
    /// Authenticated user, `None` for anonymous connections.
    pub user_id: Option<UserId>,
    /// When the connection was opened.
    pub started: OffsetDateTime,
    /// Connection type reported by the instance (for example `HTTP`).
    pub kind: String,
}

/// Values for a connection that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConnection {
    /// Owning instance.
    pub instance_name: String,
    /// Peer address of the client.
    pub peer: String,
    /// Authenticated user, `None` for anonymous connections.
    pub user_id: Option<UserId>,
    /// When the connection was opened.
    pub started: OffsetDateTime,
    /// Connection type reported by the instance.
    pub kind: String,
}

/// A viewing or recording subscription.
///
/// The only mutation a stored subscription accepts is setting `stopped`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Surrogate key.
    pub id: SubscriptionPk,
    /// Owning instance.
    pub instance_name: String,
    /// Attributed user, if any.
    pub user_id: Option<UserId>,
    /// Channel being watched or recorded.
    pub channel_id: ChannelId,
    /// Identifier assigned by the instance. May be reused over time.
    pub subscription_id: u64,
    /// When the subscription started.
    pub started: OffsetDateTime,
    /// Programme title at the time the subscription was seen.
    pub title: String,
    /// Service (mux/stream) name.
    pub service: String,
    /// When the subscription ended, `None` while active.
    pub stopped: Option<OffsetDateTime>,
}

impl Subscription {
    /// Returns the deduplication key of this record.
    #[must_use]
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey {
            instance_name: self.instance_name.clone(),
            user_id: self.user_id,
            channel_id: self.channel_id,
            subscription_id: self.subscription_id,
            started: self.started,
        }
    }

    /// Returns `true` while no stop has been recorded.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.stopped.is_none()
    }
}

/// Deduplication key of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    /// Owning instance.
    pub instance_name: String,
    /// Attributed user, if any.
    pub user_id: Option<UserId>,
    /// Channel being watched or recorded.
    pub channel_id: ChannelId,
    /// Identifier assigned by the instance.
    pub subscription_id: u64,
    /// When the subscription started.
    pub started: OffsetDateTime,
}

/// Values for a subscription that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    /// Deduplication key of the new record.
    pub key: SubscriptionKey,
    /// Programme title.
    pub title: String,
    /// Service name.
    pub service: String,
}

/// Errors raised by [`EntityStore`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An insert collided with an existing record of the same natural key.
    #[error("{entity} {key} already exists")]
    UniqueViolation {
        /// Kind of the colliding record.
        entity: EntityKind,
        /// Rendered natural key.
        key: String,
    },

    /// An operation referenced an instance that has never been stored.
    #[error("instance '{name}' has not been stored")]
    MissingInstance {
        /// Hostname that was looked up.
        name: String,
    },

    /// A channel could not be resolved after it was ensured.
    #[error("channel '{channel}' is missing on instance '{instance}'")]
    MissingChannel {
        /// Owning instance.
        instance: String,
        /// Channel name that was looked up.
        channel: String,
    },

    /// An update targeted a record that does not exist.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Kind of the missing record.
        entity: EntityKind,
        /// Rendered key.
        key: String,
    },

    /// The storage backend failed.
    #[error("storage backend failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a unique-constraint violation.
    pub fn unique_violation(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::UniqueViolation {
            entity,
            key: key.into(),
        }
    }

    /// Creates a missing-instance error.
    pub fn missing_instance(name: impl Into<String>) -> Self {
        Self::MissingInstance { name: name.into() }
    }

    /// Creates a missing-channel error.
    pub fn missing_channel(instance: impl Into<String>, channel: impl Into<String>) -> Self {
        Self::MissingChannel {
            instance: instance.into(),
            channel: channel.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a backend failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` when the error is a unique-constraint collision.
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

/// Storage contract for the correlation engine.
///
/// Implementations must reject an insert whose natural key already exists
/// with [`StoreError::UniqueViolation`]. The engine relies on that to stay
/// idempotent when two writers race between an existence check and an insert.
#[cfg_attr(test, mockall::automock)]
pub trait EntityStore: Send + Sync {
    /// Looks up an instance by hostname.
    fn find_instance(&self, name: &str) -> Result<Option<Instance>, StoreError>;

    /// Stores a new instance.
    fn insert_instance(&self, name: &str) -> Result<Instance, StoreError>;

    /// Looks up a user by `(instance, name)`.
    fn find_user(&self, instance_name: &str, name: &str) -> Result<Option<User>, StoreError>;

    /// Stores a new user.
    fn insert_user(&self, instance_name: &str, name: &str) -> Result<User, StoreError>;

    /// Looks up a channel by `(instance, name)`.
    fn find_channel(&self, instance_name: &str, name: &str)
    -> Result<Option<Channel>, StoreError>;

    /// Stores a new channel.
    fn insert_channel(&self, instance_name: &str, name: &str) -> Result<Channel, StoreError>;

    /// Looks up a connection by `(instance, peer, started)`.
    fn find_connection(
        &self,
        instance_name: &str,
        peer: &str,
        started: OffsetDateTime,
    ) -> Result<Option<Connection>, StoreError>;

    /// Stores a new connection.
    fn insert_connection(&self, connection: NewConnection) -> Result<Connection, StoreError>;

    /// Returns the most recently started subscription with the given
    /// provider identifier on an instance.
    fn find_latest_subscription(
        &self,
        instance_name: &str,
        subscription_id: u64,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Looks up a subscription by its deduplication key.
    fn find_subscription(&self, key: &SubscriptionKey)
    -> Result<Option<Subscription>, StoreError>;

    /// Stores a new subscription.
    fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, StoreError>;

    /// Records the stop timestamp of a subscription.
    fn update_subscription_stop(
        &self,
        id: SubscriptionPk,
        stopped: OffsetDateTime,
    ) -> Result<(), StoreError>;

    /// Lists every stored instance ordered by hostname.
    fn instances(&self) -> Result<Vec<Instance>, StoreError>;

    /// Lists the users of an instance ordered by name.
    fn users(&self, instance_name: &str) -> Result<Vec<User>, StoreError>;

    /// Lists the channels of an instance ordered by name.
    fn channels(&self, instance_name: &str) -> Result<Vec<Channel>, StoreError>;

    /// Lists the subscriptions of an instance in insertion order.
    fn subscriptions(&self, instance_name: &str) -> Result<Vec<Subscription>, StoreError>;
}
