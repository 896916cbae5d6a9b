//! unit-ingest: a ticker-driven multi-task insert load generator.
//!
//! The workload itself lives in the `loadtest-populate` crate and the MySQL
//! store in `loadtest-populate-mysql`; this crate wires them to the command
//! line and stdin.

pub mod cli;
pub mod loadtest;
