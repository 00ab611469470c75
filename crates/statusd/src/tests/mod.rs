//! Test suites for the status daemon.

pub(crate) mod support;
