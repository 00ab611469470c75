//! Status daemon for networked media-server instances.
//!
//! The daemon keeps a de-duplicated history of what its instances report:
//! which instances were reachable, which clients connected, and which
//! channels were streamed or recorded for how long. Polled state arrives once
//! per cycle and repeats itself, so every write in the [`persistence`] layer
//! is idempotent, and a subscription stop is matched to the most recent start
//! carrying the same provider identifier.
//!
//! Alongside ingestion the daemon answers typed client queries. Each
//! [`message::Request`] is routed by a [`message::HandlerRegistry`] to the
//! one handler that declared its kind.
//!
//! The binary reads a JSONL feed of [`ingest::Observation`]s from standard
//! input and writes answers to standard output. Logs go to standard error
//! through the subscriber configured in `telemetry`.

mod bootstrap;
pub mod clock;
pub mod events;
mod feed;
mod health;
pub mod ingest;
pub mod message;
pub mod persistence;
mod telemetry;

pub use bootstrap::{
    Applied, BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with, default_registry,
};
pub use feed::{FeedSummary, run_feed};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Bootstraps the daemon from the process environment with `tracing`-backed
/// reporting and no extra event listeners.
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap() -> Result<Daemon, BootstrapError> {
    bootstrap_with(
        &SystemConfigLoader,
        std::sync::Arc::new(StructuredHealthReporter::new()),
        events::EventBus::new(),
    )
}

#[cfg(test)]
mod tests;
