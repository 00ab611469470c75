//! Test double for [`PersistenceReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;

use crate::persistence::{
    Channel, Connection, EntityKind, Instance, PersistenceReporter, Subscription, User,
};

/// Persistence events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceEvent {
    InstanceStored(String),
    UserStored { instance: String, user: String },
    ChannelStored { instance: String, channel: String },
    ConnectionStored { instance: String, peer: String },
    SubscriptionStored { instance: String, subscription_id: u64 },
    SubscriptionStopped { instance: String, subscription_id: u64 },
    OrphanedStop { instance: String, subscription_id: u64 },
    StopAlreadyRecorded { instance: String, subscription_id: u64 },
    InsertRaced(EntityKind),
}

/// Records persistence events for assertions.
#[derive(Debug, Default)]
pub struct RecordingPersistenceReporter {
    events: Mutex<Vec<PersistenceEvent>>,
}

impl RecordingPersistenceReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<PersistenceEvent> {
        self.events
            .lock()
            .expect("persistence reporter mutex poisoned")
            .clone()
    }

    /// Counts the recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&PersistenceEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    fn record(&self, event: PersistenceEvent) {
        self.events
            .lock()
            .expect("persistence reporter mutex poisoned")
            .push(event);
    }
}

impl PersistenceReporter for RecordingPersistenceReporter {
    fn instance_stored(&self, instance: &Instance) {
        self.record(PersistenceEvent::InstanceStored(instance.name.clone()));
    }

    fn user_stored(&self, user: &User) {
        self.record(PersistenceEvent::UserStored {
            instance: user.instance_name.clone(),
            user: user.name.clone(),
        });
    }

    fn channel_stored(&self, channel: &Channel) {
        self.record(PersistenceEvent::ChannelStored {
            instance: channel.instance_name.clone(),
            channel: channel.name.clone(),
        });
    }

    fn connection_stored(&self, connection: &Connection) {
        self.record(PersistenceEvent::ConnectionStored {
            instance: connection.instance_name.clone(),
            peer: connection.peer.clone(),
        });
    }

    fn subscription_stored(&self, subscription: &Subscription, _user_name: Option<&str>) {
        self.record(PersistenceEvent::SubscriptionStored {
            instance: subscription.instance_name.clone(),
            subscription_id: subscription.subscription_id,
        });
    }

    fn subscription_stopped(&self, subscription: &Subscription) {
        self.record(PersistenceEvent::SubscriptionStopped {
            instance: subscription.instance_name.clone(),
            subscription_id: subscription.subscription_id,
        });
    }

    fn orphaned_stop(&self, instance_name: &str, subscription_id: u64) {
        self.record(PersistenceEvent::OrphanedStop {
            instance: instance_name.to_owned(),
            subscription_id,
        });
    }

    fn stop_already_recorded(&self, subscription: &Subscription) {
        self.record(PersistenceEvent::StopAlreadyRecorded {
            instance: subscription.instance_name.clone(),
            subscription_id: subscription.subscription_id,
        });
    }

    fn insert_raced(&self, entity: EntityKind, _key: &str) {
        self.record(PersistenceEvent::InsertRaced(entity));
    }
}
