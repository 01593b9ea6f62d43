//! Output formatting for the `snmp-fleet`/`snmp-record` binaries.
//!
//! Grounded on the teacher's `cli::output`: library code logs through
//! `tracing`, binaries print user-facing summaries with `println!`/
//! `eprintln!` at the CLI edge only. Supports human-readable and JSON
//! output, matching [`crate::cli::args::OutputFormat`].

use crate::cli::args::OutputFormat;
use crate::recording::Record;
use serde::Serialize;
use std::io::{self, Write};

/// Write a one-line startup summary once a fleet has bound its sockets.
pub fn write_fleet_started(num_devices: usize, port_start: u16, port_end: u16) {
    println!(
        "snmp-fleet: {} device(s) listening on ports {}-{}",
        num_devices, port_start, port_end
    );
}

/// Write a shutdown notice.
pub fn write_fleet_stopped() {
    println!("snmp-fleet: stopped");
}

/// Write an error to stderr in the `Error: ...` shape the teacher's
/// `cli::output::write_error` uses.
pub fn write_error(err: &crate::Error) {
    eprintln!("Error: {}", err);
}

/// JSON/human summary of a recorder walk, written to stdout once the
/// walk completes (the `.snmprec` payload itself goes to the output
/// file, not stdout).
#[derive(Debug, Serialize)]
pub struct WalkSummary {
    pub target: String,
    pub records_written: usize,
    pub output_path: String,
}

/// Result context for formatting a recorder walk's outcome.
pub struct RecorderOutputContext {
    pub format: OutputFormat,
}

impl RecorderOutputContext {
    pub fn write_summary(&self, summary: &WalkSummary) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
                writeln!(stdout, "{}", json)
            }
            OutputFormat::Human | OutputFormat::Raw => {
                writeln!(
                    stdout,
                    "wrote {} record(s) from {} to {}",
                    summary.records_written, summary.target, summary.output_path
                )
            }
        }
    }
}

/// Render walked records as `.snmprec` text and write them to `path`,
/// or to stdout when `path` is `None`.
pub fn write_records(records: &[Record], path: Option<&std::path::Path>) -> io::Result<()> {
    let text = crate::recording::serialize(records);
    match path {
        Some(path) => std::fs::write(path, text),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())
        }
    }
}
