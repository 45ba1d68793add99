//! Operator tooling for tier state controllers
//!
//! The `tierctl` binary is a thin clap front end over [`commands`]; the
//! command implementations live here so they can be exercised from tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Command implementations
pub mod commands;

/// Flush sink writing partition manifests to a local directory
pub mod sink;

pub use sink::LocalDirFlushSink;
