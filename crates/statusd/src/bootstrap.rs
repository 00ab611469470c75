//! Daemon bootstrap orchestration.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use statusd_config::Config;

use crate::events::EventBus;
use crate::feed::{self, FeedSummary};
use crate::health::HealthReporter;
use crate::ingest::{IngestError, Observation, StatusIngestor};
use crate::message::handlers::{InstancesHandler, StatisticsHandler, UsersHandler};
use crate::message::{ClientHandle, DispatchError, HandlerRegistry, Request, Response};
use crate::persistence::{EntityStore, InMemoryStore, PersistenceManager, StoreError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a configuration built in code.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A built-in handler could not be registered.
    #[error("failed to register message handlers: {source}")]
    Registration {
        /// Routing conflict reported by the registry.
        #[source]
        source: DispatchError,
    },
}

/// What applying one observation produced.
#[derive(Debug)]
pub enum Applied {
    /// A polling cycle was ingested; failed instances are listed.
    Cycle {
        /// Instances whose facts could not be persisted.
        failures: Vec<IngestError>,
    },
    /// A subscription state change was applied.
    StateChange(Result<(), StoreError>),
    /// A client request was answered.
    Response(Result<Response, DispatchError>),
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    store: Arc<InMemoryStore>,
    registry: HandlerRegistry,
    bus: Arc<EventBus>,
    ingestor: StatusIngestor,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The entity store backing the engine and the handlers.
    #[must_use]
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// The request routing table.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// The event bus the ingestor publishes on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The ingestor applying polled state.
    #[must_use]
    pub fn ingestor(&self) -> &StatusIngestor {
        &self.ingestor
    }

    /// Routes a client request to its handler.
    ///
    /// # Errors
    ///
    /// See [`HandlerRegistry::dispatch`].
    pub fn dispatch(
        &self,
        request: &Request,
        sender: &ClientHandle,
    ) -> Result<Response, DispatchError> {
        self.registry.dispatch(request, sender)
    }

    /// Applies one observation from the feed.
    pub fn apply(&self, observation: &Observation) -> Applied {
        match observation {
            Observation::Cycle { instances } => Applied::Cycle {
                failures: self.ingestor.ingest_cycle(instances),
            },
            Observation::StateChange {
                instance_name,
                change,
            } => Applied::StateChange(self.ingestor.apply_state_change(instance_name, change)),
            Observation::Request { request } => {
                Applied::Response(self.dispatch(request, &ClientHandle::local()))
            }
        }
    }

    /// Applies every observation read from `input`, writing request answers
    /// to `output`, until end of input.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from reading `input` or writing `output`.
    pub fn serve(&self, input: impl BufRead, output: impl Write) -> io::Result<FeedSummary> {
        let summary = feed::run_feed(self, input, output)?;
        self.reporter.feed_finished(&summary);
        Ok(summary)
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// `bus` carries the listeners that should observe ingestion; it is frozen
/// once the daemon is built.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or handler
/// registration fails. The reporter sees every failure.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    bus: EventBus,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    let registry = match default_registry(store.clone(), &config) {
        Ok(registry) => registry,
        Err(source) => {
            let error = BootstrapError::Registration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let bus = Arc::new(bus);
    let ingestor = StatusIngestor::new(
        PersistenceManager::with_store(store.clone()),
        Arc::clone(&bus),
    );
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        telemetry,
        store,
        registry,
        bus,
        ingestor,
        reporter,
    })
}

/// Registry holding the built-in handlers, reading from `store`.
///
/// A configured popular limit of zero disables the default limit.
///
/// # Errors
///
/// Returns [`DispatchError::DuplicateHandler`] if two built-in handlers claim
/// the same request kind.
pub fn default_registry(
    store: Arc<dyn EntityStore>,
    config: &Config,
) -> Result<HandlerRegistry, DispatchError> {
    let default_limit = Some(config.popular_limit()).filter(|limit| *limit > 0);

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(InstancesHandler::new(store.clone())))?;
    registry.register(Arc::new(UsersHandler::new(store.clone())))?;
    registry.register(Arc::new(StatisticsHandler::new(store, default_limit)))?;
    Ok(registry)
}
