//! Idempotent persistence of observed media-server state.
//!
//! The polling layer reports live state once per cycle, so the same instance,
//! connection and subscription arrive many times. [`PersistenceManager`] turns
//! that stream into a de-duplicated history: each fact is written at most once
//! and a subscription stop is correlated with the start it concludes.
//!
//! Storage is reached through the [`EntityStore`] trait. [`InMemoryStore`] is
//! the bundled implementation.

mod facts;
mod manager;
mod memory;
mod reporter;
mod store;

pub use facts::{
    ConnectionStatus, InstanceFact, InstanceStatus, StateChange, SubscriptionState,
    SubscriptionStatus, SubscriptionType,
};
pub use manager::PersistenceManager;
pub use memory::InMemoryStore;
pub use reporter::{PersistenceReporter, StructuredPersistenceReporter};
pub use store::{
    Channel, ChannelId, Connection, ConnectionId, DVR_USER_NAME, EntityKind, EntityStore,
    Instance, NewConnection, NewSubscription, StoreError, Subscription, SubscriptionKey,
    SubscriptionPk, User, UserId,
};

#[cfg(test)]
pub use store::MockEntityStore;
