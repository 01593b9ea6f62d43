//! Binds OID prefixes to chains of stateful [`transforms::Transform`]s and
//! resolves the longest matching binding for a given request OID.
//!
//! Grounded on the teacher's `v3::engine::EngineCache` (small `Vec` scanned
//! linearly, keyed lookup under a lock) generalized to prefix matching
//! instead of exact matching, since a table column binding applies to every
//! row beneath it.

pub mod transforms;

use crate::oid::Oid;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub use transforms::{Transform, TransformState, VariationOutcome};

/// One OID binding: the prefix it matches and the ordered chain of
/// transforms applied to values beneath it. Multiple transforms on one
/// binding apply in sequence; the first to return `Drop` or `Timeout`
/// short-circuits the rest.
pub struct Binding {
    pub prefix: Oid,
    pub transforms: Vec<Box<dyn Transform>>,
}

/// Resolves the variation binding for a request OID by longest-prefix
/// match, and owns the per-OID state each bound transform needs.
pub struct VariationBinder {
    // Sorted by descending prefix arc count so the first match found by a
    // linear scan is always the longest (most specific) one.
    bindings: Vec<Binding>,
    state: Mutex<HashMap<Oid, Vec<TransformState>>>,
}

impl VariationBinder {
    pub fn new(mut bindings: Vec<Binding>) -> Arc<Self> {
        bindings.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Arc::new(Self {
            bindings,
            state: Mutex::new(HashMap::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Apply the longest-matching binding (if any) to `base`, returning the
    /// resulting outcome. Returns `Value(base.clone())` unchanged when no
    /// binding matches.
    pub fn resolve(&self, oid: &Oid, base: &Value) -> VariationOutcome {
        self.resolve_and_detect_change(oid, base).0
    }

    /// Like [`Self::resolve`], but also reports whether the produced value
    /// (on a `Value` outcome) differs from `base` - used to drive the
    /// variation-triggered trap source (spec §4.6: "enqueued when a
    /// variation transform observes a change").
    pub fn resolve_and_detect_change(&self, oid: &Oid, base: &Value) -> (VariationOutcome, bool) {
        let Some(binding) = self.bindings.iter().find(|b| oid.starts_with(&b.prefix)) else {
            return (VariationOutcome::Value(base.clone()), false);
        };

        let now = Instant::now();
        let mut states = self.state.lock();
        let slots = states
            .entry(oid.clone())
            .or_insert_with(|| vec![TransformState::default(); binding.transforms.len()]);
        if slots.len() < binding.transforms.len() {
            slots.resize_with(binding.transforms.len(), TransformState::default);
        }

        let mut current = base.clone();
        for (transform, state) in binding.transforms.iter().zip(slots.iter_mut()) {
            match transform.apply(&current, state, now) {
                VariationOutcome::Value(v) => current = v,
                terminal => return (terminal, false),
            }
        }
        let changed = current != *base;
        (VariationOutcome::Value(current), changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use std::time::Duration;

    #[test]
    fn longest_prefix_wins() {
        let binder = VariationBinder::new(vec![
            Binding {
                prefix: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10),
                transforms: vec![Box::new(transforms::CounterMonotonic { delta: 100 })],
            },
            Binding {
                prefix: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1),
                transforms: vec![Box::new(transforms::CounterMonotonic { delta: 999 })],
            },
        ]);
        let oid = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1);
        match binder.resolve(&oid, &Value::Counter32(0)) {
            VariationOutcome::Value(Value::Counter32(v)) => assert_eq!(v, 999),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unmatched_oid_passes_through() {
        let binder = VariationBinder::empty();
        let oid = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        assert_eq!(
            binder.resolve(&oid, &Value::from("unchanged")),
            VariationOutcome::Value(Value::from("unchanged"))
        );
    }

    #[test]
    fn state_is_independent_per_oid_instance() {
        let binder = VariationBinder::new(vec![Binding {
            prefix: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10),
            transforms: vec![Box::new(transforms::CounterMonotonic { delta: 10 })],
        }]);
        let row1 = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1);
        let row2 = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 2);

        binder.resolve(&row1, &Value::Counter32(0));
        binder.resolve(&row1, &Value::Counter32(0));
        let result = binder.resolve(&row2, &Value::Counter32(0));
        assert_eq!(result, VariationOutcome::Value(Value::Counter32(10)));
    }

    #[test]
    fn timeout_short_circuits_remaining_transforms() {
        let binder = VariationBinder::new(vec![Binding {
            prefix: oid!(1, 3, 6, 1, 4, 1, 55555),
            transforms: vec![
                Box::new(transforms::Timeout {
                    delay: Duration::from_millis(10),
                }),
                Box::new(transforms::DropOid),
            ],
        }]);
        let oid = oid!(1, 3, 6, 1, 4, 1, 55555, 1);
        match binder.resolve(&oid, &Value::Integer(1)) {
            VariationOutcome::Timeout(d) => assert_eq!(d, Duration::from_millis(10)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
