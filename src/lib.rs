//! cli-template -- a small command-line tool skeleton.
//!
//! Three subcommands (`health`, `echo`, `status`) over a configuration layer
//! that merges the environment with a local TOML file, and an optional
//! append-only execution log in SQLite or PostgreSQL.

pub mod commands;
pub mod config;
pub mod output;
pub mod storage;
