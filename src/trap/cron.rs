//! Cron-scheduled trap ticks.
//!
//! Grounded on `dmaynor-netdisco-rust`'s use of the `cron` crate for its
//! polling scheduler: parse once at startup, sleep until each computed
//! `upcoming()` instant rather than polling on an interval.

use crate::error::{ConfigErrorKind, Error, Result};
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;

use super::{TrapManagerHandle, event_oid};

/// A parsed 5-field cron expression driving the cron-scheduled trap source.
#[derive(Clone)]
pub struct CronTicker {
    schedule: Schedule,
}

impl CronTicker {
    /// Parse a standard 5-field cron spec (`minute hour day-of-month month
    /// day-of-week`, no seconds field). The `cron` crate requires a leading
    /// seconds field, so one fixed at `0` is prepended here.
    pub fn parse(expr: &str) -> Result<Self> {
        let six_field = format!("0 {expr}");
        let schedule = Schedule::from_str(&six_field).map_err(|e| {
            Error::config(ConfigErrorKind::OutOfRange {
                detail: format!("invalid cron expression {expr:?}: {e}"),
            })
        })?;
        Ok(Self { schedule })
    }

    /// Sleep until each upcoming tick and enqueue a cron trap, forever.
    /// Exits once `handle`'s receiving end has been dropped (fleet
    /// shutdown), since `enqueue` becomes a no-op at that point.
    pub async fn run(self, handle: TrapManagerHandle) {
        loop {
            let Some(next) = self.schedule.upcoming(Utc).next() else {
                return;
            };
            let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;
            if !handle.enqueue(event_oid::cron(), Vec::new()) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_expression() {
        assert!(CronTicker::parse("not a cron spec").is_err());
    }

    #[test]
    fn accepts_standard_five_field_expression() {
        assert!(CronTicker::parse("*/5 * * * *").is_ok());
        assert!(CronTicker::parse("0 0 1 1 *").is_ok());
    }
}
