//! Answers `instances` requests.

use std::sync::Arc;

use crate::message::handler::{MessageHandler, undeclared};
use crate::message::{ClientHandle, DispatchError, Request, RequestKind, Response};
use crate::persistence::EntityStore;

/// Lists every tracked instance.
pub struct InstancesHandler {
    store: Arc<dyn EntityStore>,
}

impl InstancesHandler {
    /// Creates a handler reading from `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

impl MessageHandler for InstancesHandler {
    fn supported_requests(&self) -> &[RequestKind] {
        &[RequestKind::Instances]
    }

    fn handle(
        &self,
        request: &Request,
        _sender: &ClientHandle,
    ) -> Result<Response, DispatchError> {
        let Request::Instances = request else {
            return Err(undeclared(self, request));
        };

        let instances = self
            .store
            .instances()?
            .into_iter()
            .map(|instance| instance.name)
            .collect();
        Ok(Response::Instances { instances })
    }
}
