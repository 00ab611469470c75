//! Request routing for client queries.
//!
//! Clients send typed [`Request`]s. The [`HandlerRegistry`] routes each one to
//! the single [`MessageHandler`] that declared its [`RequestKind`] and returns
//! that handler's [`Response`]. A request no handler declared fails with
//! [`DispatchError::UnhandledMessage`].
//!
//! ## Protocol
//!
//! Requests and responses are JSON objects tagged by `type`:
//!
//! ```json
//! {"type":"users","instance_name":"tvh.example.net"}
//! {"type":"users","instance_name":"tvh.example.net","users":["alice","bob"]}
//! ```

mod errors;
mod handler;
pub mod handlers;
mod registry;
mod request;
mod response;
mod sender;

pub use errors::DispatchError;
pub use handler::MessageHandler;
pub use registry::HandlerRegistry;
pub use request::{Request, RequestKind};
pub use response::{PopularityEntry, Response};
pub use sender::ClientHandle;
