//! Event listener double that records what it receives.

use std::sync::{Arc, Mutex};

use crate::events::{Event, EventListener, EventName};

/// Delivery log shared by several listeners, as `(label, name)` pairs.
pub type ListenerLog = Arc<Mutex<Vec<(String, EventName)>>>;

/// Records every event delivered to it, and appends its label to a log
/// that may be shared with other listeners to observe delivery order.
#[derive(Debug)]
pub struct RecordingListener {
    label: String,
    log: ListenerLog,
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    /// Builds a listener with a private log.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_log(label, Self::shared_log())
    }

    /// Builds a listener appending to `log`.
    pub fn with_log(label: impl Into<String>, log: ListenerLog) -> Self {
        Self {
            label: label.into(),
            log,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Creates an empty log to share between listeners.
    pub fn shared_log() -> ListenerLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Snapshot of a shared log.
    pub fn entries(log: &ListenerLog) -> Vec<(String, EventName)> {
        log.lock().expect("listener log mutex poisoned").clone()
    }

    /// Events received by this listener.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .expect("listener mutex poisoned")
            .clone()
    }

    /// Names of the events received by this listener.
    pub fn names(&self) -> Vec<EventName> {
        self.events().iter().map(Event::name).collect()
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &Event) {
        self.log
            .lock()
            .expect("listener log mutex poisoned")
            .push((self.label.clone(), event.name()));
        self.events
            .lock()
            .expect("listener mutex poisoned")
            .push(event.clone());
    }
}
