//! Routing of requests to the single handler that answers them.
//!
//! The registry is filled while the daemon is assembled and only read
//! afterwards, so dispatch takes `&self` and may run from many threads.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::errors::DispatchError;
use super::handler::MessageHandler;
use super::request::{Request, RequestKind};
use super::response::Response;
use super::sender::ClientHandle;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Maps each request kind to exactly one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<RequestKind, Arc<dyn MessageHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every kind it declares.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateHandler`] if any declared kind is
    /// already claimed. The registry is left unchanged in that case.
    pub fn register(&mut self, handler: Arc<dyn MessageHandler>) -> Result<(), DispatchError> {
        let kinds = handler.supported_requests();
        if let Some(kind) = kinds.iter().find(|kind| self.handlers.contains_key(*kind)) {
            return Err(DispatchError::duplicate_handler(*kind));
        }

        for kind in kinds {
            debug!(
                target: DISPATCH_TARGET,
                request_type = kind.as_str(),
                handler = handler.name(),
                "registered message handler"
            );
            self.handlers.insert(*kind, Arc::clone(&handler));
        }
        Ok(())
    }

    /// Returns `true` when some handler answers `kind`.
    #[must_use]
    pub fn handles(&self, kind: RequestKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Request kinds with a registered handler, in ascending order.
    pub fn registered_kinds(&self) -> impl Iterator<Item = RequestKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Routes `request` to its handler and returns the handler's answer.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnhandledMessage`] when no handler declares
    /// the request's kind, and otherwise whatever the handler returns.
    pub fn dispatch(
        &self,
        request: &Request,
        sender: &ClientHandle,
    ) -> Result<Response, DispatchError> {
        let kind = request.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            debug!(
                target: DISPATCH_TARGET,
                request_type = kind.as_str(),
                client = %sender,
                "no handler for request"
            );
            return Err(DispatchError::unhandled(kind));
        };

        debug!(
            target: DISPATCH_TARGET,
            request_type = kind.as_str(),
            instance = request.instance_name().unwrap_or("-"),
            handler = handler.name(),
            client = %sender,
            "dispatching request"
        );
        handler.handle(request, sender)
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(kind, handler)| (kind.as_str(), handler.name())),
            )
            .finish()
    }
}
