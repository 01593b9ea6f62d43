//! A fleet of simulated SNMP devices behind one process.
//!
//! Every agent in the fleet has its own UDP identity, its own MIB dataset
//! (loaded from a `.snmprec` recording), its own SNMPv3 USM engine state,
//! and its own variation bindings for values that drift over time. The
//! crate supports GET/GET-NEXT/GET-BULK/SET against v1, v2c, and v3
//! (no-auth/auth-no-priv/auth-priv) requests, a trap/inform notification
//! source fed by cron ticks, variation-observed changes, and rejected
//! SETs, and a recorder client that walks a live device into a new
//! `.snmprec` file.
//!
//! See [`fleet::Fleet`] for the top-level entry point.

pub mod agent;
pub mod ber;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fleet;
pub mod message;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod recorder;
pub mod recording;
pub mod router;
pub mod store;
pub mod transport;
pub mod trap;
mod util;
pub mod v3;
pub mod value;
pub mod varbind;
pub mod variation;
pub mod version;

pub use error::{Error, Result};
