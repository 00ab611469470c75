//! Correlation engine that turns observed facts into durable records.
//!
//! The polling layer reports the same live state over and over, once per
//! cycle. Every operation here therefore checks for an existing record before
//! it writes, and is a no-op when the fact was already persisted. The store's
//! unique constraints cover the gap between the check and the insert: a
//! [`StoreError::UniqueViolation`] on insert means another writer stored the
//! same key first, which is the same outcome as the no-op.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};

use super::facts::{
    ConnectionStatus, InstanceFact, StateChange, SubscriptionState, SubscriptionStatus,
    SubscriptionType,
};
use super::reporter::{PersistenceReporter, StructuredPersistenceReporter};
use super::store::{
    DVR_USER_NAME, EntityKind, EntityStore, NewConnection, NewSubscription, StoreError,
    Subscription, SubscriptionKey, User,
};

/// Persists observed facts idempotently and correlates subscription stops
/// with the starts they conclude.
#[derive(Clone)]
pub struct PersistenceManager {
    store: Arc<dyn EntityStore>,
    reporter: Arc<dyn PersistenceReporter>,
    clock: Arc<dyn Clock>,
}

impl PersistenceManager {
    /// Creates a manager from its collaborators.
    pub fn new(
        store: Arc<dyn EntityStore>,
        reporter: Arc<dyn PersistenceReporter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            reporter,
            clock,
        }
    }

    /// Creates a manager that logs through `tracing` and reads the system
    /// clock.
    pub fn with_store(store: Arc<dyn EntityStore>) -> Self {
        Self::new(
            store,
            Arc::new(StructuredPersistenceReporter::new()),
            Arc::new(SystemClock),
        )
    }

    /// Stores an instance the first time it is seen, together with its
    /// synthetic DVR user.
    ///
    /// The DVR user is ensured on every sighting, so a user insert that
    /// failed after its instance was stored is retried on the next cycle.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn on_instance_seen(&self, instance: &InstanceFact) -> Result<(), StoreError> {
        if self.store.find_instance(&instance.hostname)?.is_none() {
            if let Some(stored) = self.created(self.store.insert_instance(&instance.hostname))? {
                self.reporter.instance_stored(&stored);
            }
        }

        self.on_user_seen(&instance.hostname, DVR_USER_NAME)
    }

    /// Stores a connection the first time it is seen.
    ///
    /// Authenticated connections also ensure their user exists and reference
    /// it. Anonymous connections store no user reference and create no user.
    ///
    /// # Errors
    ///
    /// Propagates store failures, including a user that cannot be resolved
    /// after it was ensured.
    pub fn on_connection_seen(
        &self,
        instance_name: &str,
        status: &ConnectionStatus,
    ) -> Result<(), StoreError> {
        if self
            .store
            .find_connection(instance_name, &status.peer, status.started)?
            .is_some()
        {
            return Ok(());
        }

        let user_id = match status.user_name() {
            Some(user_name) => {
                self.on_user_seen(instance_name, user_name)?;
                Some(self.resolve_user(instance_name, user_name)?.id)
            }
            None => None,
        };

        let connection = NewConnection {
            instance_name: instance_name.to_owned(),
            peer: status.peer.clone(),
            user_id,
            started: status.started,
            kind: status.kind.clone(),
        };
        if let Some(stored) = self.created(self.store.insert_connection(connection))? {
            self.reporter.connection_stored(&stored);
        }
        Ok(())
    }

    /// Stores a user the first time `(instance, name)` is seen.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn on_user_seen(&self, instance_name: &str, user_name: &str) -> Result<(), StoreError> {
        if self.store.find_user(instance_name, user_name)?.is_some() {
            return Ok(());
        }

        if let Some(stored) = self.created(self.store.insert_user(instance_name, user_name))? {
            self.reporter.user_stored(&stored);
        }
        Ok(())
    }

    /// Stores a channel the first time `(instance, name)` is seen.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn on_channel_seen(
        &self,
        instance_name: &str,
        channel_name: &str,
    ) -> Result<(), StoreError> {
        if self.store.find_channel(instance_name, channel_name)?.is_some() {
            return Ok(());
        }

        if let Some(stored) =
            self.created(self.store.insert_channel(instance_name, channel_name))?
        {
            self.reporter.channel_stored(&stored);
        }
        Ok(())
    }

    /// Stores a subscription the first time its deduplication key is seen.
    ///
    /// EPG grabber subscriptions are discarded. Recordings are attributed to
    /// the DVR user whatever user name the fact carries. The attributed user
    /// is looked up but not created; a user the store does not know leaves
    /// the subscription without a user reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingInstance`] for an instance that was never
    /// stored, and propagates every other store failure.
    pub fn on_subscription_seen(
        &self,
        instance_name: &str,
        status: &SubscriptionStatus,
    ) -> Result<(), StoreError> {
        if status.kind == SubscriptionType::EpgGrab {
            return Ok(());
        }

        let user_name = match status.kind {
            SubscriptionType::Recording => Some(DVR_USER_NAME),
            _ => status.username.as_deref().filter(|name| !name.is_empty()),
        };

        let instance = self
            .store
            .find_instance(instance_name)?
            .ok_or_else(|| StoreError::missing_instance(instance_name))?;
        let user = match user_name {
            Some(name) => self.store.find_user(&instance.name, name)?,
            None => None,
        };

        self.on_channel_seen(&instance.name, &status.channel)?;
        let channel = self
            .store
            .find_channel(&instance.name, &status.channel)?
            .ok_or_else(|| StoreError::missing_channel(&instance.name, &status.channel))?;

        let key = SubscriptionKey {
            instance_name: instance.name,
            user_id: user.as_ref().map(|user| user.id),
            channel_id: channel.id,
            subscription_id: status.id,
            started: status.start,
        };
        if self.store.find_subscription(&key)?.is_some() {
            return Ok(());
        }

        let subscription = NewSubscription {
            key,
            title: status.title.clone(),
            service: status.service.clone(),
        };
        if let Some(stored) = self.created(self.store.insert_subscription(subscription))? {
            self.reporter
                .subscription_stored(&stored, user.as_ref().map(|user| user.name.as_str()));
        }
        Ok(())
    }

    /// Records the stop of the most recently started subscription carrying
    /// the change's provider identifier.
    ///
    /// Start transitions are ignored because starts are persisted by
    /// [`Self::on_subscription_seen`]. A stop with no matching subscription is
    /// reported as orphaned and otherwise ignored. A stop for a subscription
    /// that already ended leaves the recorded timestamp untouched.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn on_subscription_state_change(
        &self,
        instance_name: &str,
        change: &StateChange,
    ) -> Result<(), StoreError> {
        if change.state == SubscriptionState::Started {
            return Ok(());
        }

        let Some(subscription) = self
            .store
            .find_latest_subscription(instance_name, change.subscription_id)?
        else {
            self.reporter
                .orphaned_stop(instance_name, change.subscription_id);
            return Ok(());
        };

        if !subscription.is_active() {
            self.reporter.stop_already_recorded(&subscription);
            return Ok(());
        }

        let stopped = self.clock.now();
        self.store
            .update_subscription_stop(subscription.id, stopped)?;
        self.reporter.subscription_stopped(&Subscription {
            stopped: Some(stopped),
            ..subscription
        });
        Ok(())
    }

    fn resolve_user(&self, instance_name: &str, user_name: &str) -> Result<User, StoreError> {
        self.store
            .find_user(instance_name, user_name)?
            .ok_or_else(|| StoreError::not_found(EntityKind::User, user_name))
    }

    /// Maps an insert result, treating a lost insert race as "nothing new".
    fn created<T>(&self, result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
        match result {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::UniqueViolation { entity, key }) => {
                self.reporter.insert_raced(entity, &key);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }
}
