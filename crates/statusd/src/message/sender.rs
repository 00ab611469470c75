//! Identity of the client that sent a request.

use std::fmt;

/// Opaque handle to the client a request came from.
///
/// Handlers receive it alongside the request so they can attribute work to a
/// client. The daemon's own stdin feed uses [`ClientHandle::local`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientHandle {
    id: u64,
    peer: Option<String>,
}

impl ClientHandle {
    /// Creates a handle for the client with the given identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id, peer: None }
    }

    /// Handle for requests read from the daemon's standard input.
    #[must_use]
    pub const fn local() -> Self {
        Self::new(0)
    }

    /// Attaches the client's peer address.
    #[must_use]
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Client identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Peer address, when known.
    #[must_use]
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peer {
            Some(peer) => write!(f, "client #{} ({peer})", self.id),
            None => write!(f, "client #{}", self.id),
        }
    }
}
