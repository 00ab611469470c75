//! Typed responses returned by message handlers.

use serde::{Deserialize, Serialize};

/// A ranked entry in a popularity listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PopularityEntry {
    /// Channel or user name.
    pub name: String,
    /// Number of stored subscriptions attributed to `name`.
    pub count: usize,
}

impl PopularityEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// A handler's answer to a [`Request`](super::Request).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Every tracked instance.
    Instances {
        /// Instance hostnames in ascending order.
        instances: Vec<String>,
    },
    /// The users of one instance.
    Users {
        /// Instance hostname.
        instance_name: String,
        /// User names in ascending order.
        users: Vec<String>,
    },
    /// Channels of one instance ranked by subscription count.
    PopularChannels {
        /// Instance hostname.
        instance_name: String,
        /// Ranked channels.
        channels: Vec<PopularityEntry>,
    },
    /// Users of one instance ranked by subscription count.
    PopularUsers {
        /// Instance hostname.
        instance_name: String,
        /// Ranked users.
        users: Vec<PopularityEntry>,
    },
}

impl Response {
    /// Serialises the response as a single JSONL line, newline included.
    ///
    /// # Errors
    ///
    /// Returns the serde error if serialisation fails.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
