//! In-process [`EntityStore`] backed by ordered maps.
//!
//! Every table sits behind one mutex, so a uniqueness check and the insert it
//! guards always run in the same critical section. Child records must point at
//! a stored instance; the store rejects them with
//! [`StoreError::MissingInstance`] otherwise.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;

use super::store::{
    Channel, ChannelId, Connection, ConnectionId, EntityKind, EntityStore, Instance,
    NewConnection, NewSubscription, StoreError, Subscription, SubscriptionKey, SubscriptionPk,
    User, UserId,
};

type NameKey = (String, String);
type ConnectionKey = (String, String, OffsetDateTime);

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    instances: BTreeMap<String, Instance>,
    users: BTreeMap<NameKey, User>,
    channels: BTreeMap<NameKey, Channel>,
    connections: BTreeMap<ConnectionKey, Connection>,
    subscriptions: BTreeMap<SubscriptionPk, Subscription>,
    subscription_index: BTreeMap<SubscriptionKey, SubscriptionPk>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_instance(&self, name: &str) -> Result<(), StoreError> {
        if self.instances.contains_key(name) {
            Ok(())
        } else {
            Err(StoreError::missing_instance(name))
        }
    }
}

/// Thread-safe in-memory entity store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }

    /// Number of stored connections across all instances.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the store lock is poisoned.
    pub fn connection_count(&self) -> Result<usize, StoreError> {
        Ok(self.tables()?.connections.len())
    }

    /// Lists the connections of an instance ordered by peer and start time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the store lock is poisoned.
    pub fn connections(&self, instance_name: &str) -> Result<Vec<Connection>, StoreError> {
        Ok(self
            .tables()?
            .connections
            .values()
            .filter(|connection| connection.instance_name == instance_name)
            .cloned()
            .collect())
    }
}

fn name_key(instance_name: &str, name: &str) -> NameKey {
    (instance_name.to_owned(), name.to_owned())
}

impl EntityStore for InMemoryStore {
    fn find_instance(&self, name: &str) -> Result<Option<Instance>, StoreError> {
        Ok(self.tables()?.instances.get(name).cloned())
    }

    fn insert_instance(&self, name: &str) -> Result<Instance, StoreError> {
        let mut tables = self.tables()?;
        if tables.instances.contains_key(name) {
            return Err(StoreError::unique_violation(EntityKind::Instance, name));
        }
        let instance = Instance {
            name: name.to_owned(),
        };
        tables.instances.insert(name.to_owned(), instance.clone());
        Ok(instance)
    }

    fn find_user(&self, instance_name: &str, name: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()?
            .users
            .get(&name_key(instance_name, name))
            .cloned())
    }

    fn insert_user(&self, instance_name: &str, name: &str) -> Result<User, StoreError> {
        let mut tables = self.tables()?;
        tables.require_instance(instance_name)?;
        let key = name_key(instance_name, name);
        if tables.users.contains_key(&key) {
            return Err(StoreError::unique_violation(
                EntityKind::User,
                format!("{instance_name}/{name}"),
            ));
        }
        let user = User {
            id: UserId::new(tables.allocate_id()),
            instance_name: instance_name.to_owned(),
            name: name.to_owned(),
        };
        tables.users.insert(key, user.clone());
        Ok(user)
    }

    fn find_channel(
        &self,
        instance_name: &str,
        name: &str,
    ) -> Result<Option<Channel>, StoreError> {
        Ok(self
            .tables()?
            .channels
            .get(&name_key(instance_name, name))
            .cloned())
    }

    fn insert_channel(&self, instance_name: &str, name: &str) -> Result<Channel, StoreError> {
        let mut tables = self.tables()?;
        tables.require_instance(instance_name)?;
        let key = name_key(instance_name, name);
        if tables.channels.contains_key(&key) {
            return Err(StoreError::unique_violation(
                EntityKind::Channel,
                format!("{instance_name}/{name}"),
            ));
        }
        let channel = Channel {
            id: ChannelId::new(tables.allocate_id()),
            instance_name: instance_name.to_owned(),
            name: name.to_owned(),
        };
        tables.channels.insert(key, channel.clone());
        Ok(channel)
    }

    fn find_connection(
        &self,
        instance_name: &str,
        peer: &str,
        started: OffsetDateTime,
    ) -> Result<Option<Connection>, StoreError> {
        let key = (instance_name.to_owned(), peer.to_owned(), started);
        Ok(self.tables()?.connections.get(&key).cloned())
    }

    fn insert_connection(&self, connection: NewConnection) -> Result<Connection, StoreError> {
        let mut tables = self.tables()?;
        tables.require_instance(&connection.instance_name)?;
        let key = (
            connection.instance_name.clone(),
            connection.peer.clone(),
            connection.started,
        );
        if tables.connections.contains_key(&key) {
            return Err(StoreError::unique_violation(
                EntityKind::Connection,
                format!(
                    "{}/{}@{}",
                    connection.instance_name, connection.peer, connection.started
                ),
            ));
        }
        let stored = Connection {
            id: ConnectionId::new(tables.allocate_id()),
            instance_name: connection.instance_name,
            peer: connection.peer,
            user_id: connection.user_id,
            started: connection.started,
            kind: connection.kind,
        };
        tables.connections.insert(key, stored.clone());
        Ok(stored)
    }

    fn find_latest_subscription(
        &self,
        instance_name: &str,
        subscription_id: u64,
    ) -> Result<Option<Subscription>, StoreError> {
        // Equal start times fall back to the most recently inserted record.
        Ok(self
            .tables()?
            .subscriptions
            .values()
            .filter(|subscription| {
                subscription.instance_name == instance_name
                    && subscription.subscription_id == subscription_id
            })
            .max_by_key(|subscription| (subscription.started, subscription.id))
            .cloned())
    }

    fn find_subscription(
        &self,
        key: &SubscriptionKey,
    ) -> Result<Option<Subscription>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .subscription_index
            .get(key)
            .and_then(|pk| tables.subscriptions.get(pk))
            .cloned())
    }

    fn insert_subscription(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let mut tables = self.tables()?;
        tables.require_instance(&subscription.key.instance_name)?;
        if tables.subscription_index.contains_key(&subscription.key) {
            return Err(StoreError::unique_violation(
                EntityKind::Subscription,
                format!(
                    "{}#{}@{}",
                    subscription.key.instance_name,
                    subscription.key.subscription_id,
                    subscription.key.started
                ),
            ));
        }
        let id = SubscriptionPk::new(tables.allocate_id());
        let NewSubscription {
            key,
            title,
            service,
        } = subscription;
        let stored = Subscription {
            id,
            instance_name: key.instance_name.clone(),
            user_id: key.user_id,
            channel_id: key.channel_id,
            subscription_id: key.subscription_id,
            started: key.started,
            title,
            service,
            stopped: None,
        };
        tables.subscription_index.insert(key, id);
        tables.subscriptions.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_subscription_stop(
        &self,
        id: SubscriptionPk,
        stopped: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        match tables.subscriptions.get_mut(&id) {
            Some(subscription) => {
                subscription.stopped = Some(stopped);
                Ok(())
            }
            None => Err(StoreError::not_found(
                EntityKind::Subscription,
                id.to_string(),
            )),
        }
    }

    fn instances(&self) -> Result<Vec<Instance>, StoreError> {
        Ok(self.tables()?.instances.values().cloned().collect())
    }

    fn users(&self, instance_name: &str) -> Result<Vec<User>, StoreError> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|user| user.instance_name == instance_name)
            .cloned()
            .collect())
    }

    fn channels(&self, instance_name: &str) -> Result<Vec<Channel>, StoreError> {
        Ok(self
            .tables()?
            .channels
            .values()
            .filter(|channel| channel.instance_name == instance_name)
            .cloned()
            .collect())
    }

    fn subscriptions(&self, instance_name: &str) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .tables()?
            .subscriptions
            .values()
            .filter(|subscription| subscription.instance_name == instance_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests;
