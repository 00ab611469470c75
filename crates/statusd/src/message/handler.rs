//! The contract every request handler implements.

use super::errors::DispatchError;
use super::request::{Request, RequestKind};
use super::response::Response;
use super::sender::ClientHandle;

/// Answers the request kinds it declares.
///
/// A handler is registered once with a
/// [`HandlerRegistry`](super::HandlerRegistry) and from then on receives
/// every request whose kind appears in [`Self::supported_requests`]. The
/// declared set must not change after registration.
pub trait MessageHandler: Send + Sync {
    /// Request kinds this handler answers.
    fn supported_requests(&self) -> &[RequestKind];

    /// Answers `request` on behalf of `sender`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the request cannot be answered.
    fn handle(&self, request: &Request, sender: &ClientHandle)
    -> Result<Response, DispatchError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Error for a request that reached a handler which never declared its kind.
pub(crate) fn undeclared(
    handler: &(impl MessageHandler + ?Sized),
    request: &Request,
) -> DispatchError {
    DispatchError::internal(format!(
        "{} cannot answer {} requests",
        handler.name(),
        request.kind()
    ))
}
