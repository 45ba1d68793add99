//! `tierctl` subcommands

pub mod check_config;
pub mod graph;
pub mod simulate;
pub mod wire;
