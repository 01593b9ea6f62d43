//! snmp-fleet: run a fleet of simulated SNMP devices from a directory of
//! configuration files.
//!
//! Thin binary: parses CLI flags with `clap`, builds a [`Fleet`], starts
//! it, and waits for Ctrl-C. All protocol logic lives in the library;
//! this binary only resolves paths, converts config-load errors to a
//! process exit code (`anyhow::Context` at the CLI edge, matching the
//! teacher's library/CLI split), and prints a short startup/shutdown
//! summary to stdout.

use anyhow::Context;
use clap::Parser;
use snmp_fleet::cli::args::OutputArgs;
use snmp_fleet::cli::output;
use snmp_fleet::config::{RoutingConfig, TrapDestinationsConfig, V3UserConfig, VariationConfig};
use snmp_fleet::fleet::{Fleet, FleetOptions};
use snmp_fleet::oid::Oid;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

/// Run a fleet of simulated SNMP devices.
#[derive(Debug, Parser)]
#[command(name = "snmp-fleet", version, about)]
struct Args {
    /// Address every agent's UDP socket binds to.
    #[arg(long, default_value = "0.0.0.0")]
    listen: IpAddr,

    /// First UDP port; agents bind to consecutive ports from here.
    #[arg(long)]
    port_start: u16,

    /// Last UDP port available for agents (inclusive).
    #[arg(long)]
    port_end: u16,

    /// Number of simulated devices to run.
    #[arg(long)]
    devices: usize,

    /// `.snmprec` file backing the default dataset every agent starts from.
    #[arg(long)]
    dataset: PathBuf,

    /// Routing rules YAML (spec §6.4).
    #[arg(long)]
    routes: Option<PathBuf>,

    /// Variation bindings YAML (spec §6.5).
    #[arg(long)]
    variations: Option<PathBuf>,

    /// SNMPv3 users YAML (a `users:` list of the same shape consumed by
    /// [`snmp_fleet::config::V3UserConfig`]).
    #[arg(long)]
    v3_users: Option<PathBuf>,

    /// Trap destinations YAML.
    #[arg(long)]
    trap_destinations: Option<PathBuf>,

    /// Five-field cron expression driving the scheduled trap source.
    #[arg(long)]
    cron: Option<String>,

    /// OIDs that trigger a trap when a SET against them is rejected
    /// (dotted notation, comma-separated). Omit to trap on every SET.
    #[arg(long, value_delimiter = ',')]
    set_trap_oids: Option<Vec<String>>,

    /// Where each agent's `engineBoots` counter is persisted across restarts.
    #[arg(long, default_value = "snmp-fleet-engine-boots.json")]
    engine_boots_path: PathBuf,

    /// Community string accepted for v1/v2c requests.
    #[arg(long, default_value = "public")]
    community: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(serde::Deserialize)]
struct V3UsersFile {
    #[serde(default)]
    users: Vec<V3UserConfig>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    args.output.init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let routes = args
        .routes
        .as_ref()
        .map(RoutingConfig::load_file)
        .transpose()
        .context("loading routing config")?;

    let variations = args
        .variations
        .as_ref()
        .map(VariationConfig::load_file)
        .transpose()
        .context("loading variation config")?;

    let v3_users = match &args.v3_users {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading v3 users file {}", path.display()))?;
            let file: V3UsersFile =
                serde_yaml::from_str(&text).context("parsing v3 users YAML")?;
            file.users
        }
        None => Vec::new(),
    };

    let trap_destinations = match &args.trap_destinations {
        Some(path) => TrapDestinationsConfig::load_file(path)
            .context("loading trap destinations config")?
            .into_destinations()
            .context("converting trap destinations config")?,
        None => Vec::new(),
    };

    let set_trap_oids = args
        .set_trap_oids
        .map(|oids| {
            oids.iter()
                .map(|s| Oid::parse(s).map_err(|e| anyhow::anyhow!("invalid OID '{s}': {e}")))
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .transpose()?;

    let options = FleetOptions {
        listen_addr: args.listen,
        port_start: args.port_start,
        port_end: args.port_end,
        num_devices: args.devices,
        dataset_path: args.dataset,
        routes,
        variations,
        v3_users,
        trap_destinations,
        cron_expr: args.cron,
        set_trap_oids,
        engine_boots_path: args.engine_boots_path,
        community: args.community,
    };

    let mut fleet = Fleet::new(options)
        .await
        .context("building fleet from configuration")?;
    fleet.start().await.context("starting fleet")?;
    output::write_fleet_started(fleet.agents().len(), args.port_start, args.port_end);

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    fleet.stop().await;
    output::write_fleet_stopped();
    Ok(())
}
