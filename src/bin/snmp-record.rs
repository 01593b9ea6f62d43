//! snmp-record: walk a live (or simulated) SNMP agent with GET-NEXT and
//! write the results out as a `.snmprec` file.
//!
//! Thin binary over [`snmp_fleet::recorder::walk`]; v1/v2c only (the
//! recorder itself has no USM support - see `recorder::mod`'s doc
//! comment on why it stays single-target and un-authenticated).

use anyhow::Context;
use clap::Parser;
use snmp_fleet::cli::args::{CommonArgs, OutputArgs, SnmpVersion};
use snmp_fleet::cli::output::{self, RecorderOutputContext, WalkSummary};
use snmp_fleet::oid::Oid;
use snmp_fleet::recorder::{self, WalkOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Walk a remote agent's MIB subtree and record it to a `.snmprec` file.
#[derive(Debug, Parser)]
#[command(name = "snmp-record", version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    output: OutputArgs,

    /// Root OID to walk (dotted notation). Defaults to the whole MIB.
    #[arg(long, default_value = "1.3.6")]
    base_oid: String,

    /// Maximum GET-NEXT requests before giving up.
    #[arg(long, default_value_t = 100_000)]
    max_iterations: usize,

    /// Output file; omit to write to stdout.
    #[arg(short, long)]
    out: Option<PathBuf>,
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
    if args.common.snmp_version == SnmpVersion::V3 {
        anyhow::bail!("snmp-record does not support SNMPv3 targets");
    }

    let target = args
        .common
        .target_addr()
        .context("resolving target address")?;
    let base_oid = Oid::parse(&args.base_oid)
        .map_err(|e| anyhow::anyhow!("invalid base OID '{}': {e}", args.base_oid))?;

    let options = WalkOptions {
        version: args.common.snmp_version.into(),
        community: args.common.community.clone(),
        base_oid,
        timeout: args.common.timeout_duration(),
        max_iterations: args.max_iterations,
    };

    let records = recorder::walk(target, &options)
        .await
        .context("walking target")?;

    output::write_records(&records, args.out.as_deref()).context("writing output")?;

    // A summary alongside the `.snmprec` payload only makes sense when the
    // payload went to a file; writing both to stdout would interleave them.
    if let Some(out) = &args.out {
        let summary = WalkSummary {
            target: target.to_string(),
            records_written: records.len(),
            output_path: out.display().to_string(),
        };
        let ctx = RecorderOutputContext {
            format: args.output.format,
        };
        ctx.write_summary(&summary).context("writing summary")?;
    }

    Ok(())
}
