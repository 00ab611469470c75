//! Unit tests for the in-memory entity store.

use rstest::{fixture, rstest};
use time::macros::datetime;

use super::*;

const HOST: &str = "tvh.example.net";

#[fixture]
fn store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_instance(HOST).expect("insert instance");
    store
}

fn new_subscription(
    channel_id: ChannelId,
    subscription_id: u64,
    started: OffsetDateTime,
) -> NewSubscription {
    NewSubscription {
        key: SubscriptionKey {
            instance_name: HOST.to_owned(),
            user_id: None,
            channel_id,
            subscription_id,
            started,
        },
        title: String::from("News"),
        service: String::from("Mux 1"),
    }
}

#[rstest]
fn rejects_duplicate_instance(store: InMemoryStore) {
    let error = store.insert_instance(HOST).expect_err("duplicate instance");
    assert!(error.is_unique_violation());
}

#[rstest]
fn rejects_duplicate_user_per_instance(store: InMemoryStore) {
    store.insert_user(HOST, "alice").expect("first insert");
    let error = store
        .insert_user(HOST, "alice")
        .expect_err("duplicate user");
    assert!(matches!(
        error,
        StoreError::UniqueViolation {
            entity: EntityKind::User,
            ..
        }
    ));
}

#[rstest]
fn same_user_name_on_another_instance_is_distinct(store: InMemoryStore) {
    store.insert_instance("other.example.net").expect("instance");
    let first = store.insert_user(HOST, "alice").expect("first");
    let second = store
        .insert_user("other.example.net", "alice")
        .expect("second");
    assert_ne!(first.id, second.id);
}

#[rstest]
fn users_require_a_stored_instance(store: InMemoryStore) {
    let result = store.insert_user("unknown", "alice");
    assert!(matches!(result, Err(StoreError::MissingInstance { .. })));
}

#[rstest]
fn channels_require_a_stored_instance(store: InMemoryStore) {
    let result = store.insert_channel("unknown", "BBC One");
    assert!(matches!(result, Err(StoreError::MissingInstance { .. })));
}

#[rstest]
fn connection_lookup_uses_instance_peer_and_start(store: InMemoryStore) {
    let started = datetime!(2024-03-01 20:00 UTC);
    store
        .insert_connection(NewConnection {
            instance_name: HOST.to_owned(),
            peer: String::from("10.0.0.5"),
            user_id: None,
            started,
            kind: String::from("HTTP"),
        })
        .expect("insert connection");

    assert!(
        store
            .find_connection(HOST, "10.0.0.5", started)
            .expect("lookup")
            .is_some()
    );
    assert!(
        store
            .find_connection(HOST, "10.0.0.6", started)
            .expect("lookup")
            .is_none()
    );
    assert!(
        store
            .find_connection(HOST, "10.0.0.5", datetime!(2024-03-01 20:01 UTC))
            .expect("lookup")
            .is_none()
    );
}

#[rstest]
fn latest_subscription_prefers_newest_start(store: InMemoryStore) {
    let channel = store.insert_channel(HOST, "BBC One").expect("channel");
    let starts = [
        datetime!(2024-03-01 18:00 UTC),
        datetime!(2024-03-01 21:00 UTC),
        datetime!(2024-03-01 19:00 UTC),
    ];
    for started in starts {
        store
            .insert_subscription(new_subscription(channel.id, 7, started))
            .expect("insert subscription");
    }
    store
        .insert_subscription(new_subscription(
            channel.id,
            8,
            datetime!(2024-03-01 23:00 UTC),
        ))
        .expect("insert unrelated subscription");

    let latest = store
        .find_latest_subscription(HOST, 7)
        .expect("lookup")
        .expect("a match");
    assert_eq!(latest.started, datetime!(2024-03-01 21:00 UTC));
}

#[rstest]
fn rejects_duplicate_subscription_key(store: InMemoryStore) {
    let channel = store.insert_channel(HOST, "BBC One").expect("channel");
    let started = datetime!(2024-03-01 18:00 UTC);
    store
        .insert_subscription(new_subscription(channel.id, 7, started))
        .expect("first insert");
    let error = store
        .insert_subscription(new_subscription(channel.id, 7, started))
        .expect_err("duplicate key");
    assert!(error.is_unique_violation());
}

#[rstest]
fn update_stop_marks_subscription_ended(store: InMemoryStore) {
    let channel = store.insert_channel(HOST, "BBC One").expect("channel");
    let stored = store
        .insert_subscription(new_subscription(
            channel.id,
            7,
            datetime!(2024-03-01 18:00 UTC),
        ))
        .expect("insert");
    let stopped = datetime!(2024-03-01 19:30 UTC);
    store
        .update_subscription_stop(stored.id, stopped)
        .expect("update stop");

    let reloaded = store
        .find_subscription(&stored.key())
        .expect("lookup")
        .expect("stored");
    assert_eq!(reloaded.stopped, Some(stopped));
    assert!(!reloaded.is_active());
}

#[rstest]
fn update_stop_rejects_unknown_subscription(store: InMemoryStore) {
    let error = store
        .update_subscription_stop(SubscriptionPk::new(999), datetime!(2024-03-01 19:30 UTC))
        .expect_err("unknown pk");
    assert!(matches!(error, StoreError::NotFound { .. }));
}

#[rstest]
fn listings_are_scoped_to_the_instance(store: InMemoryStore) {
    store.insert_instance("other.example.net").expect("instance");
    store.insert_user(HOST, "bob").expect("bob");
    store.insert_user(HOST, "alice").expect("alice");
    store
        .insert_user("other.example.net", "carol")
        .expect("carol");

    let names: Vec<String> = store
        .users(HOST)
        .expect("users")
        .into_iter()
        .map(|user| user.name)
        .collect();
    assert_eq!(names, vec![String::from("alice"), String::from("bob")]);
    assert_eq!(store.instances().expect("instances").len(), 2);
}
