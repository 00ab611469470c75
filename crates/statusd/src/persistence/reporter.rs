//! Structured reporting for persistence events.

use std::sync::Arc;

use super::store::{Channel, Connection, EntityKind, Instance, Subscription, User};

/// Tracing target for persistence events.
pub(crate) const PERSISTENCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::persistence");

/// Observer the correlation engine reports every durable change to.
pub trait PersistenceReporter: Send + Sync {
    /// A new instance was stored.
    fn instance_stored(&self, instance: &Instance);

    /// A new user was stored. Also invoked for the synthetic DVR user.
    fn user_stored(&self, user: &User);

    /// A new channel was stored.
    fn channel_stored(&self, channel: &Channel);

    /// A new connection was stored.
    fn connection_stored(&self, connection: &Connection);

    /// A new subscription was stored.
    fn subscription_stored(&self, subscription: &Subscription, user_name: Option<&str>);

    /// A subscription stop was recorded.
    fn subscription_stopped(&self, subscription: &Subscription);

    /// A stop arrived for a subscription that was never stored.
    fn orphaned_stop(&self, instance_name: &str, subscription_id: u64);

    /// A stop arrived for a subscription whose stop is already recorded.
    fn stop_already_recorded(&self, subscription: &Subscription);

    /// An insert lost a race against a concurrent writer of the same key.
    fn insert_raced(&self, entity: EntityKind, key: &str);
}

impl<T> PersistenceReporter for Arc<T>
where
    T: PersistenceReporter + ?Sized,
{
    fn instance_stored(&self, instance: &Instance) {
        (**self).instance_stored(instance);
    }

    fn user_stored(&self, user: &User) {
        (**self).user_stored(user);
    }

    fn channel_stored(&self, channel: &Channel) {
        (**self).channel_stored(channel);
    }

    fn connection_stored(&self, connection: &Connection) {
        (**self).connection_stored(connection);
    }

    fn subscription_stored(&self, subscription: &Subscription, user_name: Option<&str>) {
        (**self).subscription_stored(subscription, user_name);
    }

    fn subscription_stopped(&self, subscription: &Subscription) {
        (**self).subscription_stopped(subscription);
    }

    fn orphaned_stop(&self, instance_name: &str, subscription_id: u64) {
        (**self).orphaned_stop(instance_name, subscription_id);
    }

    fn stop_already_recorded(&self, subscription: &Subscription) {
        (**self).stop_already_recorded(subscription);
    }

    fn insert_raced(&self, entity: EntityKind, key: &str) {
        (**self).insert_raced(entity, key);
    }
}

/// Default reporter that records persistence events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredPersistenceReporter;

impl StructuredPersistenceReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PersistenceReporter for StructuredPersistenceReporter {
    fn instance_stored(&self, instance: &Instance) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "instance_stored",
            instance = %instance.name,
            "stored new instance"
        );
    }

    fn user_stored(&self, user: &User) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "user_stored",
            instance = %user.instance_name,
            user = %user.name,
            special = user.is_dvr(),
            "stored new user"
        );
    }

    fn channel_stored(&self, channel: &Channel) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "channel_stored",
            instance = %channel.instance_name,
            channel = %channel.name,
            "stored new channel"
        );
    }

    fn connection_stored(&self, connection: &Connection) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "connection_stored",
            instance = %connection.instance_name,
            peer = %connection.peer,
            anonymous = connection.user_id.is_none(),
            "stored new connection"
        );
    }

    fn subscription_stored(&self, subscription: &Subscription, user_name: Option<&str>) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "subscription_stored",
            instance = %subscription.instance_name,
            subscription_id = subscription.subscription_id,
            user = user_name.unwrap_or("N/A"),
            title = %subscription.title,
            "stored new subscription"
        );
    }

    fn subscription_stopped(&self, subscription: &Subscription) {
        tracing::info!(
            target: PERSISTENCE_TARGET,
            event = "subscription_stopped",
            instance = %subscription.instance_name,
            subscription_id = subscription.subscription_id,
            started = %subscription.started,
            "stored subscription stop"
        );
    }

    fn orphaned_stop(&self, instance_name: &str, subscription_id: u64) {
        tracing::warn!(
            target: PERSISTENCE_TARGET,
            event = "orphaned_stop",
            instance = instance_name,
            subscription_id,
            "got subscription stop without a matching start"
        );
    }

    fn stop_already_recorded(&self, subscription: &Subscription) {
        tracing::debug!(
            target: PERSISTENCE_TARGET,
            event = "stop_already_recorded",
            instance = %subscription.instance_name,
            subscription_id = subscription.subscription_id,
            "subscription stop already recorded"
        );
    }

    fn insert_raced(&self, entity: EntityKind, key: &str) {
        tracing::debug!(
            target: PERSISTENCE_TARGET,
            event = "insert_raced",
            entity = %entity,
            key,
            "record stored concurrently by another writer"
        );
    }
}
