//! Well-known scalar overlay resolved ahead of the dataset.
//!
//! `sysUpTime.0` always reflects this process's actual uptime (a recorded
//! value would immediately go stale); `sysName.0`/`sysLocation.0` default to
//! the agent's configured identity but a dataset that explicitly defines
//! them wins, so a recording captured from a real device keeps its own
//! identity if the operator wants that.

use crate::dataset::Dataset;
use crate::oid::Oid;
use crate::value::Value;
use std::sync::LazyLock;
use std::time::Instant;

static SYS_UP_TIME: LazyLock<Oid> = LazyLock::new(|| Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 3, 0]));
static SYS_NAME: LazyLock<Oid> = LazyLock::new(|| Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 5, 0]));
static SYS_LOCATION: LazyLock<Oid> = LazyLock::new(|| Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 6, 0]));

pub fn sys_up_time_oid() -> &'static Oid {
    &SYS_UP_TIME
}

/// `sysUpTime.0` in TimeTicks (hundredths of a second) since `origin`.
pub fn sys_up_time_value(origin: Instant) -> Value {
    let ticks = origin.elapsed().as_millis() / 10;
    Value::TimeTicks(ticks.min(u32::MAX as u128) as u32)
}

/// Identity overlay: returns `Some(value)` for `sysName.0`/`sysLocation.0`
/// if the dataset doesn't already define them, `None` otherwise (including
/// for every other OID).
pub fn identity_overlay(oid: &Oid, sys_name: &str, sys_location: &str) -> Option<Value> {
    if oid == &*SYS_NAME {
        Some(Value::from(sys_name))
    } else if oid == &*SYS_LOCATION {
        Some(Value::from(sys_location))
    } else {
        None
    }
}

pub fn is_sys_up_time(oid: &Oid) -> bool {
    oid == &*SYS_UP_TIME
}

/// The overlay OIDs in ascending order, the same order a walk surfaces
/// them in.
fn overlay_oids() -> [&'static Oid; 3] {
    [&SYS_UP_TIME, &SYS_NAME, &SYS_LOCATION]
}

/// Smallest overlay OID strictly greater than `cursor` that isn't already
/// present in `dataset`. A dataset that explicitly defines one of these
/// scalars is left to surface it through the dataset's own successor
/// sequence, so a walk never reports the same OID twice.
pub fn next_missing_overlay(cursor: &Oid, dataset: &Dataset) -> Option<&'static Oid> {
    let mut best: Option<&'static Oid> = None;
    for oid in overlay_oids() {
        if oid > cursor && dataset.get(oid).is_none() {
            best = match best {
                Some(b) if b <= oid => Some(b),
                _ => Some(oid),
            };
        }
    }
    best
}

/// Resolve the live value for one of the three overlay OIDs.
pub fn overlay_value(oid: &Oid, sys_name: &str, sys_location: &str, uptime_origin: Instant) -> Value {
    if oid == &*SYS_UP_TIME {
        sys_up_time_value(uptime_origin)
    } else if oid == &*SYS_NAME {
        Value::from(sys_name)
    } else {
        Value::from(sys_location)
    }
}
