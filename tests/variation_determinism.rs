//! Property 7 (spec §8): variation transforms are deterministic given a
//! fixed seed, and time-based transforms are a pure function of elapsed
//! time rather than call count. Exercised through `VariationBinder`'s
//! longest-prefix resolution rather than calling `Transform::apply`
//! directly (already covered inline in `variation::transforms::tests`), so
//! these tests also confirm the per-OID state slot is what makes the
//! determinism hold up once several rows share one binding.

use snmp_fleet::oid;
use snmp_fleet::value::Value;
use snmp_fleet::variation::transforms::{CounterMonotonic, PeriodicReset, RandomJitter, Step};
use snmp_fleet::variation::{Binding, VariationBinder, VariationOutcome};
use std::time::Duration;

fn jitter_binder(seed: u64, max: u32) -> std::sync::Arc<VariationBinder> {
    VariationBinder::new(vec![Binding {
        prefix: oid!(1, 3, 6, 1, 4, 1, 9999, 1),
        transforms: vec![Box::new(RandomJitter { max, seed })],
    }])
}

/// Two independently constructed binders seeded identically, resolving the
/// same sequence of OIDs against the same base value, must produce bit for
/// bit identical output sequences.
#[test]
fn random_jitter_is_deterministic_across_independent_binders() {
    let target = oid!(1, 3, 6, 1, 4, 1, 9999, 1, 0);
    let base = Value::Gauge32(5000);

    let binder_a = jitter_binder(0xdead_beef, 500);
    let binder_b = jitter_binder(0xdead_beef, 500);

    let mut outcomes_a = Vec::new();
    let mut outcomes_b = Vec::new();
    for _ in 0..10 {
        outcomes_a.push(binder_a.resolve(&target, &base));
        outcomes_b.push(binder_b.resolve(&target, &base));
    }

    assert_eq!(outcomes_a, outcomes_b);
    // And not degenerate: a real RNG sequence over 10 draws from a [0,500]
    // range essentially never produces all-identical outputs.
    assert!(outcomes_a.windows(2).any(|pair| pair[0] != pair[1]));
}

/// A different seed must (with overwhelming probability) diverge from the
/// first call onward; otherwise the seed isn't actually wired into the
/// mixer.
#[test]
fn random_jitter_differs_across_seeds() {
    let target = oid!(1, 3, 6, 1, 4, 1, 9999, 1, 0);
    let base = Value::Gauge32(0);

    let binder_a = jitter_binder(1, 1_000_000);
    let binder_b = jitter_binder(2, 1_000_000);

    assert_ne!(binder_a.resolve(&target, &base), binder_b.resolve(&target, &base));
}

/// Two distinct row instances bound by the same table-column prefix keep
/// independent RNG state, so the sequence seen at one row does not skip
/// draws consumed by another row.
#[test]
fn random_jitter_state_is_independent_per_row_instance() {
    let binder = jitter_binder(777, 9999);
    let base = Value::Gauge32(0);

    let row1 = oid!(1, 3, 6, 1, 4, 1, 9999, 1, 1);
    let row2 = oid!(1, 3, 6, 1, 4, 1, 9999, 1, 2);

    let row1_first = binder.resolve(&row1, &base);
    let row2_first = binder.resolve(&row2, &base);
    let row1_second = binder.resolve(&row1, &base);

    // row2's first draw matches what row1's first draw was (same seed, same
    // call-count-zero state), proving the two rows don't share a counter.
    assert_eq!(row1_first, row2_first);
    // And row1's second call is a genuinely new draw, not a repeat of its
    // first.
    assert_ne!(row1_first, row1_second);
}

/// `Step`, resolved through the binder, advances only with wall-clock time:
/// calling `resolve` many times in quick succession never moves the value
/// past its first-observed step, since all those calls land within the same
/// 30-second window.
#[test]
fn step_through_binder_is_pure_function_of_elapsed_time_not_call_count() {
    let binder = VariationBinder::new(vec![Binding {
        prefix: oid!(1, 3, 6, 1, 4, 1, 9999, 2),
        transforms: vec![Box::new(Step { period: Duration::from_secs(30), delta: 7 })],
    }]);
    let target = oid!(1, 3, 6, 1, 4, 1, 9999, 2, 0);
    let base = Value::Gauge32(1000);

    let (first, _) = binder.resolve_and_detect_change(&target, &base);
    assert_eq!(first, VariationOutcome::Value(Value::Gauge32(1000)));

    // Hammer the binding back to back: call count must not matter within
    // the same period.
    for _ in 0..50 {
        let (outcome, _) = binder.resolve_and_detect_change(&target, &base);
        assert_eq!(outcome, VariationOutcome::Value(Value::Gauge32(1000)));
    }
}

/// `CounterMonotonic`, resolved through the binder across several calls,
/// advances by exactly `delta` per call and keeps independent state per
/// concrete OID instance (mirrors `state_is_independent_per_oid_instance`
/// in `variation::tests`, but checks the actual numeric progression rather
/// than just distinctness).
#[test]
fn counter_monotonic_through_binder_advances_deterministically_per_instance() {
    let binder = VariationBinder::new(vec![Binding {
        prefix: oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10),
        transforms: vec![Box::new(CounterMonotonic { delta: 100 })],
    }]);

    let row1 = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1);
    let row2 = oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 2);
    let base = Value::Counter32(1_000);

    assert_eq!(binder.resolve(&row1, &base), VariationOutcome::Value(Value::Counter32(1_100)));
    assert_eq!(binder.resolve(&row1, &base), VariationOutcome::Value(Value::Counter32(1_200)));
    // row2 starts fresh from the same base, unaffected by row1's two calls.
    assert_eq!(binder.resolve(&row2, &base), VariationOutcome::Value(Value::Counter32(1_100)));
}

/// Resolved through the binder, `PeriodicReset` reports the first-observed
/// base with `changed == false` (it establishes the baseline, not a change),
/// then increments on every subsequent call within the period (`changed ==
/// true`, since the counter has moved past `base`), confirming the
/// change-detection wiring is driven by the transform's actual output rather
/// than assuming a time-based transform never varies within its window.
#[test]
fn periodic_reset_through_binder_increments_then_reports_unchanged_at_reset() {
    let binder = VariationBinder::new(vec![Binding {
        prefix: oid!(1, 3, 6, 1, 4, 1, 9999, 3),
        transforms: vec![Box::new(PeriodicReset { period: Duration::from_secs(300) })],
    }]);
    let target = oid!(1, 3, 6, 1, 4, 1, 9999, 3, 0);
    let base = Value::Gauge32(42);

    let (first, changed_first) = binder.resolve_and_detect_change(&target, &base);
    assert_eq!(first, VariationOutcome::Value(Value::Gauge32(42)));
    assert!(!changed_first, "first observation establishes baseline, not a change");

    let (second, changed_second) = binder.resolve_and_detect_change(&target, &base);
    assert_eq!(second, VariationOutcome::Value(Value::Gauge32(43)));
    assert!(changed_second, "counter advanced past base, so this is a change");
}

/// Sanity check that per-row state isn't accidentally order-dependent:
/// resolving row2 before row1 produces the same per-row results as
/// resolving row1 before row2.
#[test]
fn resolution_order_does_not_affect_per_row_counter_state() {
    let make_binder = || {
        VariationBinder::new(vec![Binding {
            prefix: oid!(1, 3, 6, 1, 4, 1, 9999, 4),
            transforms: vec![Box::new(CounterMonotonic { delta: 1 })],
        }])
    };
    let base = Value::Counter32(0);
    let row1 = oid!(1, 3, 6, 1, 4, 1, 9999, 4, 1);
    let row2 = oid!(1, 3, 6, 1, 4, 1, 9999, 4, 2);

    let binder_a = make_binder();
    let a_row1 = binder_a.resolve(&row1, &base);
    let a_row2 = binder_a.resolve(&row2, &base);

    let binder_b = make_binder();
    let b_row2 = binder_b.resolve(&row2, &base);
    let b_row1 = binder_b.resolve(&row1, &base);

    assert_eq!(a_row1, b_row1);
    assert_eq!(a_row2, b_row2);
}
