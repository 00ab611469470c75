//! Typed client requests.
//!
//! Requests travel as single JSON lines tagged by `type`:
//!
//! ```json
//! {"type":"users","instance_name":"tvh.example.net"}
//! {"type":"popular_channels","instance_name":"tvh.example.net","limit":5}
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::errors::DispatchError;

/// Tag identifying the kind of a [`Request`]. Handlers declare the kinds they
/// answer and the registry routes on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    /// List every tracked instance.
    Instances,
    /// List the users of an instance.
    Users,
    /// Rank the channels of an instance by subscription count.
    PopularChannels,
    /// Rank the users of an instance by subscription count.
    PopularUsers,
}

impl RequestKind {
    /// Returns the request type name used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A client request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// List every tracked instance.
    Instances,
    /// List the users of an instance.
    Users {
        /// Instance hostname.
        instance_name: String,
    },
    /// Rank the channels of an instance by subscription count.
    PopularChannels {
        /// Instance hostname.
        instance_name: String,
        /// Maximum number of entries; the handler default applies when absent.
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Rank the users of an instance by subscription count.
    PopularUsers {
        /// Instance hostname.
        instance_name: String,
        /// Maximum number of entries; the handler default applies when absent.
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl Request {
    /// Creates a users request for the given instance.
    pub fn users(instance_name: impl Into<String>) -> Self {
        Self::Users {
            instance_name: instance_name.into(),
        }
    }

    /// Returns the routing tag of this request.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Instances => RequestKind::Instances,
            Self::Users { .. } => RequestKind::Users,
            Self::PopularChannels { .. } => RequestKind::PopularChannels,
            Self::PopularUsers { .. } => RequestKind::PopularUsers,
        }
    }

    /// Returns the instance the request is scoped to, if any.
    #[must_use]
    pub fn instance_name(&self) -> Option<&str> {
        match self {
            Self::Instances => None,
            Self::Users { instance_name }
            | Self::PopularChannels { instance_name, .. }
            | Self::PopularUsers { instance_name, .. } => Some(instance_name),
        }
    }

    /// Parses a JSONL line into a request.
    ///
    /// Trailing whitespace, including the newline delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Malformed`] if the line is empty or does not
    /// decode as a request.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }

        serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
    }
}
