//! BDD test world: owns the store, engine, registry and bootstrap state the
//! step functions act on.

use std::cell::RefCell;
use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use statusd_config::Config;
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

use crate::bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, bootstrap_with,
};
use crate::events::EventBus;
use crate::message::handlers::{InstancesHandler, UsersHandler};
use crate::message::{ClientHandle, DispatchError, HandlerRegistry, Request, Response};
use crate::persistence::{
    EntityStore, InMemoryStore, InstanceFact, PersistenceManager, StateChange, StoreError,
    Subscription, SubscriptionStatus, SubscriptionType,
};

use super::clock::FixedClock;
use super::health::RecordingHealthReporter;
use super::reporter::RecordingPersistenceReporter;

/// Midnight of the day every scenario timestamp is relative to.
const SCENARIO_DAY: OffsetDateTime = datetime!(2024-03-01 00:00 UTC);

/// Loader that fails by passing an unparsable CLI flag.
struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("statusd"),
            OsString::from("--popular-limit"),
            OsString::from("plenty"),
        ])
    }
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub store: Arc<InMemoryStore>,
    pub reporter: Arc<RecordingPersistenceReporter>,
    pub health: Arc<RecordingHealthReporter>,
    manager: PersistenceManager,
    registry: HandlerRegistry,
    loader: Box<dyn ConfigLoader>,
    daemon: Option<Daemon>,
    bootstrap_error: Option<BootstrapError>,
    store_error: Option<StoreError>,
    registration_error: Option<DispatchError>,
    dispatch_result: Option<Result<Response, DispatchError>>,
}

impl TestWorld {
    /// Builds a world over an empty store with a fixed clock.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let reporter = Arc::new(RecordingPersistenceReporter::default());
        let manager = PersistenceManager::new(
            store.clone(),
            reporter.clone(),
            Arc::new(FixedClock::default()),
        );
        Self {
            store,
            reporter,
            health: Arc::new(RecordingHealthReporter::default()),
            manager,
            registry: HandlerRegistry::new(),
            loader: Box::new(StaticConfigLoader::new(Config::default())),
            daemon: None,
            bootstrap_error: None,
            store_error: None,
            registration_error: None,
            dispatch_result: None,
        }
    }

    /// Timestamp `hour` hours into the scenario day.
    #[must_use]
    pub fn at_hour(hour: u8) -> OffsetDateTime {
        SCENARIO_DAY + Duration::hours(i64::from(hour))
    }

    /// Feeds an instance sighting to the engine.
    pub fn see_instance(&mut self, hostname: &str) {
        let result = self.manager.on_instance_seen(&InstanceFact::new(hostname));
        self.capture(result);
    }

    /// Feeds a subscription sighting to the engine.
    pub fn see_subscription(
        &mut self,
        hostname: &str,
        id: u64,
        kind: SubscriptionType,
        start: OffsetDateTime,
    ) {
        let status = SubscriptionStatus {
            id,
            kind,
            username: None,
            channel: String::from("BBC One"),
            start,
            title: String::from("News"),
            service: String::from("BBC One HD"),
        };
        let result = self.manager.on_subscription_seen(hostname, &status);
        self.capture(result);
    }

    /// Feeds a stop transition to the engine.
    pub fn stop_subscription(&mut self, hostname: &str, id: u64) {
        let result = self
            .manager
            .on_subscription_state_change(hostname, &StateChange::stopped(id));
        self.capture(result);
    }

    /// Stored subscriptions of an instance.
    #[must_use]
    pub fn subscriptions(&self, hostname: &str) -> Vec<Subscription> {
        self.store
            .subscriptions(hostname)
            .expect("list subscriptions")
    }

    /// The last store error the engine returned.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        self.store_error.as_ref()
    }

    /// Registers the users handler over the world's store.
    pub fn register_users_handler(&mut self) {
        let result = self
            .registry
            .register(Arc::new(UsersHandler::new(self.store.clone())));
        self.registration_error = result.err();
    }

    /// Registers the instances handler over the world's store.
    pub fn register_instances_handler(&mut self) {
        let result = self
            .registry
            .register(Arc::new(InstancesHandler::new(self.store.clone())));
        self.registration_error = result.err();
    }

    /// Routes a request through the world's registry.
    pub fn dispatch(&mut self, request: &Request) {
        self.dispatch_result = Some(self.registry.dispatch(request, &ClientHandle::new(1)));
    }

    /// Result of the last dispatch.
    #[must_use]
    pub fn dispatch_result(&self) -> Option<&Result<Response, DispatchError>> {
        self.dispatch_result.as_ref()
    }

    /// Error from the last registration attempt.
    #[must_use]
    pub fn registration_error(&self) -> Option<&DispatchError> {
        self.registration_error.as_ref()
    }

    /// The registry under test.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Installs a loader that succeeds with the defaults.
    pub fn use_successful_loader(&mut self) {
        self.loader = Box::new(StaticConfigLoader::new(Config::default()));
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.health.clone(), EventBus::new()) {
            Ok(daemon) => self.daemon = Some(daemon),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// The bootstrapped daemon, if bootstrap succeeded.
    #[must_use]
    pub fn daemon(&self) -> Option<&Daemon> {
        self.daemon.as_ref()
    }

    /// Error from bootstrap, if it failed.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    fn capture(&mut self, result: Result<(), StoreError>) {
        if let Err(error) = result {
            self.store_error = Some(error);
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a fresh world wrapped for step access.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
