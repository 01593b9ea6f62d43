//! Shared `clap` argument groups for the `snmp-fleet`/`snmp-record`
//! binaries.
//!
//! Grounded on the teacher's `cli::args` pattern referenced from
//! `bin/asnmp_get.rs`: small `#[derive(Parser)]` structs meant to be
//! `#[command(flatten)]`ed into each binary's top-level `Args`, with
//! fallible conversions (`target_addr`, `timeout_duration`) kept on the
//! struct itself rather than scattered through `main`.

use crate::error::{ConfigErrorKind, Error, Result};
use crate::v3::{AuthProtocol, PrivProtocol};
use clap::{Args, ValueEnum};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Flags shared by any binary that needs to resolve a single
/// host:port target plus request timing.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Target host or address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Target UDP port.
    #[arg(long, default_value_t = 161)]
    pub port: u16,

    /// SNMP community string (v1/v2c).
    #[arg(long, default_value = "public")]
    pub community: String,

    /// SNMP protocol version when no v3 username is given.
    #[arg(long, value_enum, default_value_t = SnmpVersion::V2c)]
    pub snmp_version: SnmpVersion,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = 2.0)]
    pub timeout: f64,

    /// Retries on timeout.
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}

impl CommonArgs {
    /// Resolve `host:port` to a concrete [`SocketAddr`], preferring a
    /// direct IP parse and falling back to a blocking DNS lookup.
    pub fn target_addr(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        format!("{}:{}", self.host, self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| {
                Error::config(ConfigErrorKind::OutOfRange {
                    detail: format!("could not resolve target '{}:{}'", self.host, self.port),
                })
            })
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout.max(0.0))
    }
}

/// SNMP protocol version, as a CLI-facing enum distinct from
/// [`crate::version::Version`] so derive(ValueEnum) stays in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    V1,
    V2c,
    V3,
}

impl From<SnmpVersion> for crate::version::Version {
    fn from(v: SnmpVersion) -> Self {
        match v {
            SnmpVersion::V1 => crate::version::Version::V1,
            SnmpVersion::V2c => crate::version::Version::V2c,
            SnmpVersion::V3 => crate::version::Version::V3,
        }
    }
}

/// SNMPv3 flags, shared by any binary that can act as a USM principal
/// (the recorder, when walking a v3-speaking target).
#[derive(Debug, Args)]
pub struct V3Args {
    /// USM username. Presence of this flag selects SNMPv3.
    #[arg(long)]
    pub username: Option<String>,

    /// Authentication protocol.
    #[arg(long, value_name = "PROTO")]
    pub auth_protocol: Option<AuthProtocol>,

    /// Authentication passphrase.
    #[arg(long)]
    pub auth_password: Option<String>,

    /// Privacy protocol.
    #[arg(long, value_name = "PROTO")]
    pub priv_protocol: Option<PrivProtocol>,

    /// Privacy passphrase.
    #[arg(long)]
    pub priv_password: Option<String>,
}

impl V3Args {
    pub fn is_v3(&self) -> bool {
        self.username.is_some()
    }

    /// Reject combinations RFC 3414 doesn't allow: privacy without
    /// authentication, or a protocol flag with no matching password.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.priv_protocol.is_some() && self.auth_protocol.is_none() {
            return Err("--priv-protocol requires --auth-protocol".into());
        }
        if self.auth_protocol.is_some() && self.auth_password.is_none() {
            return Err("--auth-protocol requires --auth-password".into());
        }
        if self.priv_protocol.is_some() && self.priv_password.is_none() {
            return Err("--priv-protocol requires --priv-password".into());
        }
        Ok(())
    }
}

/// Output formatting flags shared by every binary, including tracing
/// setup (`init_tracing` is the CLI's one and only place that installs a
/// global subscriber; library code never touches this).
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Print request/response detail to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress well-known-OID name hints.
    #[arg(long)]
    pub no_hints: bool,

    /// Force octet strings to render as hex regardless of printability.
    #[arg(long)]
    pub hex: bool,

    /// Print elapsed time alongside results.
    #[arg(long)]
    pub timing: bool,
}

impl OutputArgs {
    /// Install a `tracing-subscriber` `EnvFilter` subscriber driven by
    /// `RUST_LOG` (default `warn`), matching the teacher's `cli::output`
    /// one-shot-at-startup convention.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Raw,
}
