//! Test doubles shared by unit and behavioural suites.

mod clock;
mod health;
mod listener;
mod reporter;
mod world;

pub use clock::{FIXED_NOW, FixedClock};
pub use health::{HealthEvent, RecordingHealthReporter};
pub use listener::{ListenerLog, RecordingListener};
pub use reporter::{PersistenceEvent, RecordingPersistenceReporter};
pub use world::{TestWorld, world};
