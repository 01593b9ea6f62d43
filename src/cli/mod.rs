//! CLI utilities for the `snmp-fleet`/`snmp-record` binaries.
//!
//! This module provides command-line argument parsing and startup
//! logging. Only available with the `cli` feature.

pub mod args;
pub mod output;
