//! logmirror command-line tooling.
//!
//! The `logmirror` binary is a thin dispatcher over these modules so that
//! command handlers can be exercised directly from tests.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
