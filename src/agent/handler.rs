//! GET/GETNEXT/GETBULK resolution: overlay, then dataset, then variation.
//!
//! Grounded on the teacher's `handler::traits::MibHandler` GET/GETNEXT
//! contract (longest-prefix dispatch to a value-or-exception result), here
//! collapsed to free functions since a virtual agent has exactly one
//! backing store instead of a tree of registered handlers.

use super::overlay;
use crate::dataset::Dataset;
use crate::oid::Oid;
use crate::value::Value;
use crate::variation::{VariationBinder, VariationOutcome};
use std::time::{Duration, Instant};

/// Identity fields the overlay resolves ahead of the dataset.
pub struct Identity<'a> {
    pub sys_name: &'a str,
    pub sys_location: &'a str,
    pub uptime_origin: Instant,
}

pub enum GetOutcome {
    /// Resolved value, plus whether a bound variation transform changed it
    /// from the underlying overlay/dataset value (feeds the variation trap
    /// source).
    Value(Value, bool),
    NoSuchObject,
    Timeout(Duration),
}

pub enum GetNextOutcome {
    Value(Oid, Value, bool),
    EndOfMibView,
    Timeout(Duration),
}

/// Resolve one GET request OID to a value, applying the identity overlay
/// then the dataset then any bound variation transform.
pub fn resolve_get(
    dataset: &Dataset,
    variation: &VariationBinder,
    identity: &Identity<'_>,
    oid: &Oid,
) -> GetOutcome {
    let base = if overlay::is_sys_up_time(oid) {
        Some(overlay::sys_up_time_value(identity.uptime_origin))
    } else if let Some(v) = overlay::identity_overlay(oid, identity.sys_name, identity.sys_location) {
        // Dataset still wins if it explicitly defines sysName/sysLocation.
        Some(dataset.get(oid).unwrap_or(v))
    } else {
        dataset.get(oid)
    };

    let Some(base) = base else {
        return GetOutcome::NoSuchObject;
    };

    match variation.resolve_and_detect_change(oid, &base) {
        (VariationOutcome::Value(v), changed) => GetOutcome::Value(v, changed),
        (VariationOutcome::Drop, _) => GetOutcome::NoSuchObject,
        (VariationOutcome::Timeout(d), _) => GetOutcome::Timeout(d),
    }
}

/// Resolve one GETNEXT request OID to the next (oid, value) pair in
/// lexical/numeric succession across the overlay and dataset, applying
/// variation to whatever is found. A variation `Drop` outcome skips to the
/// following candidate so a hidden OID is transparently absent from walks.
///
/// The overlay (`sysUpTime.0`/`sysName.0`/`sysLocation.0`) is merged into
/// the successor sequence at its numerically correct position whenever the
/// dataset doesn't already define it, so a walk surfaces these scalars even
/// on a dataset that never recorded them.
pub fn resolve_get_next(
    dataset: &Dataset,
    variation: &VariationBinder,
    identity: &Identity<'_>,
    oid: &Oid,
) -> GetNextOutcome {
    let mut cursor = oid.clone();
    loop {
        let dataset_next = dataset.get_next(&cursor);
        let overlay_next = overlay::next_missing_overlay(&cursor, dataset);

        let (next_oid, base) = match (dataset_next, overlay_next) {
            (Some((d_oid, _d_val)), Some(o_oid)) if o_oid < &d_oid => {
                (o_oid.clone(), overlay_value(o_oid, identity))
            }
            (Some((d_oid, d_val)), _) => (d_oid, d_val),
            (None, Some(o_oid)) => (o_oid.clone(), overlay_value(o_oid, identity)),
            (None, None) => return GetNextOutcome::EndOfMibView,
        };

        let base = if overlay::is_sys_up_time(&next_oid) {
            overlay::sys_up_time_value(identity.uptime_origin)
        } else {
            base
        };

        match variation.resolve_and_detect_change(&next_oid, &base) {
            (VariationOutcome::Value(v), changed) => return GetNextOutcome::Value(next_oid, v, changed),
            (VariationOutcome::Drop, _) => {
                cursor = next_oid;
                continue;
            }
            (VariationOutcome::Timeout(d), _) => return GetNextOutcome::Timeout(d),
        }
    }
}

fn overlay_value(oid: &Oid, identity: &Identity<'_>) -> Value {
    overlay::overlay_value(oid, identity.sys_name, identity.sys_location, identity.uptime_origin)
}
