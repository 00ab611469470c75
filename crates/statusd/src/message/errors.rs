//! Error types for request routing and handling.
//!
//! Routing failures and handler failures share one enum so a client always
//! receives a single structured error and an exit status, whichever layer
//! rejected its request.

use thiserror::Error;

use crate::persistence::StoreError;

use super::request::RequestKind;

/// Errors surfaced while routing or answering a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered handler declares the request's kind.
    #[error("no handler registered for {request_type} requests")]
    UnhandledMessage {
        /// Kind of the request that could not be routed.
        request_type: RequestKind,
    },

    /// A handler declared a kind that another handler already claims.
    #[error("a handler for {request_type} requests is already registered")]
    DuplicateHandler {
        /// Kind claimed twice.
        request_type: RequestKind,
    },

    /// The request named an entity or value the handler cannot work with.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Request line could not be decoded.
    #[error("malformed request: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The entity store failed while answering.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// Internal error, such as a handler receiving a request it never
    /// declared.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DispatchError {
    /// Returns the exit status code for this error.
    ///
    /// Routing and argument errors return status 1. Store and internal
    /// failures return status 2.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::UnhandledMessage { .. }
            | Self::DuplicateHandler { .. }
            | Self::InvalidArguments { .. }
            | Self::Malformed { .. } => 1,
            Self::Store(_) | Self::Internal { .. } => 2,
        }
    }

    /// Creates an unhandled-message error.
    pub fn unhandled(request_type: RequestKind) -> Self {
        Self::UnhandledMessage { request_type }
    }

    /// Creates a duplicate-handler error.
    pub fn duplicate_handler(request_type: RequestKind) -> Self {
        Self::DuplicateHandler { request_type }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a malformed request error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
