//! Answers `users` requests with the people known on one instance.

use std::sync::Arc;

use crate::message::handler::{MessageHandler, undeclared};
use crate::message::{ClientHandle, DispatchError, Request, RequestKind, Response};
use crate::persistence::EntityStore;

use super::require_instance;

/// Lists the users of one instance. The synthetic DVR user is not a person
/// and is left out.
pub struct UsersHandler {
    store: Arc<dyn EntityStore>,
}

impl UsersHandler {
    /// Creates a handler reading from `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

impl MessageHandler for UsersHandler {
    fn supported_requests(&self) -> &[RequestKind] {
        &[RequestKind::Users]
    }

    fn handle(
        &self,
        request: &Request,
        _sender: &ClientHandle,
    ) -> Result<Response, DispatchError> {
        let Request::Users { instance_name } = request else {
            return Err(undeclared(self, request));
        };

        require_instance(self.store.as_ref(), instance_name)?;
        let users = self
            .store
            .users(instance_name)?
            .into_iter()
            .filter(|user| !user.is_dvr())
            .map(|user| user.name)
            .collect();
        Ok(Response::Users {
            instance_name: instance_name.clone(),
            users,
        })
    }
}
