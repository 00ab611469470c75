//! Deterministic clock for stop timestamps.

use time::OffsetDateTime;
use time::macros::datetime;

use crate::clock::Clock;

/// Instant every [`FixedClock::default`] reports.
pub const FIXED_NOW: OffsetDateTime = datetime!(2024-03-02 00:30 UTC);

/// Clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Default for FixedClock {
    fn default() -> Self {
        Self(FIXED_NOW)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
