//! Line-oriented observation feed.
//!
//! The daemon reads one JSON [`Observation`] per line. Cycles and state
//! changes are applied silently. Each request line is answered with exactly
//! one JSON line on the output: the [`Response`](crate::message::Response)
//! or an error reply carrying the exit status.
//!
//! ```json
//! {"type":"error","status":1,"message":"no handler registered for users requests"}
//! ```

use std::io::{self, BufRead, Write};
use std::string::FromUtf8Error;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::bootstrap::{Applied, Daemon};
use crate::ingest::{INGEST_TARGET, Observation};
use crate::message::DispatchError;

/// Counters describing one run of the feed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    /// Non-blank lines read.
    pub lines: usize,
    /// Lines that did not decode as an observation.
    pub malformed: usize,
    /// Instances or state changes the store rejected.
    pub failures: usize,
    /// Requests answered, including error replies.
    pub responses: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "error")]
struct ErrorReply {
    status: i32,
    message: String,
}

impl From<&DispatchError> for ErrorReply {
    fn from(error: &DispatchError) -> Self {
        Self {
            status: error.exit_status(),
            message: error.to_string(),
        }
    }
}

/// Why a feed line was skipped.
#[derive(Debug, Error)]
enum LineError {
    #[error("line is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
    #[error("line is not a valid observation: {0}")]
    Decode(#[from] serde_json::Error),
}

fn decode_line(raw: Vec<u8>) -> Result<Option<Observation>, LineError> {
    let line = String::from_utf8(raw)?;
    Ok(Observation::parse(&line)?)
}

/// Applies every observation in `input` to `daemon` and writes request
/// answers to `output`.
///
/// # Errors
///
/// Returns I/O errors from `input` or `output`. Lines that are not UTF-8 or
/// not an observation, and store failures, are logged and counted instead.
pub fn run_feed(
    daemon: &Daemon,
    input: impl BufRead,
    mut output: impl Write,
) -> io::Result<FeedSummary> {
    let mut summary = FeedSummary::default();
    for (index, raw) in input.split(b'\n').enumerate() {
        let observation = match decode_line(raw?) {
            Ok(Some(observation)) => observation,
            Ok(None) => continue,
            Err(line_error) => {
                summary.lines += 1;
                summary.malformed += 1;
                warn!(
                    target: INGEST_TARGET,
                    event = "malformed_observation",
                    line = index + 1,
                    error = %line_error,
                    "skipping malformed observation"
                );
                continue;
            }
        };
        summary.lines += 1;

        match daemon.apply(&observation) {
            Applied::Cycle { failures } => summary.failures += failures.len(),
            Applied::StateChange(Ok(())) => {}
            Applied::StateChange(Err(store_error)) => {
                summary.failures += 1;
                error!(
                    target: INGEST_TARGET,
                    event = "state_change_failed",
                    error = %store_error,
                    "failed to apply subscription state change"
                );
            }
            Applied::Response(result) => {
                summary.responses += 1;
                let reply = match result {
                    Ok(response) => response.to_json_line()?,
                    Err(dispatch_error) => {
                        let mut line = serde_json::to_string(&ErrorReply::from(&dispatch_error))?;
                        line.push('\n');
                        line
                    }
                };
                output.write_all(reply.as_bytes())?;
                output.flush()?;
            }
        }
    }
    Ok(summary)
}
