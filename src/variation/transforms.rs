//! The six required stateful value transforms.
//!
//! Grounded on the teacher's `v3::engine::EngineState` pattern for per-key
//! mutable state behind a lock, generalized from "one engine" to "one OID
//! binding, keyed by the concrete request OID so a table column's per-row
//! instances each get independent state.

use crate::value::Value;
use std::time::{Duration, Instant};

/// What a transform produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum VariationOutcome {
    Value(Value),
    /// Remove this varbind from the response entirely.
    Drop,
    /// Block the whole request (not just this varbind) for `delay`, then
    /// behave as if this OID did not exist.
    Timeout(Duration),
}

/// Per-OID mutable state a transform may need across calls. Transforms that
/// don't need state (`dropOID`) ignore this.
#[derive(Debug, Clone, Default)]
pub struct TransformState {
    pub first_seen: Option<Instant>,
    pub last_reset: Option<Instant>,
    pub counter_value: Option<i128>,
}

/// A stateful value transform bound to one OID (or OID prefix, for table
/// columns) in a [`super::VariationBinder`].
pub trait Transform: Send + Sync {
    fn apply(&self, base: &Value, state: &mut TransformState, now: Instant) -> VariationOutcome;
}

/// Increments an integer-valued counter by `delta` on every read, wrapping
/// at `u32::MAX`/`u64::MAX` depending on the base value's width.
pub struct CounterMonotonic {
    pub delta: i64,
}

impl Transform for CounterMonotonic {
    fn apply(&self, base: &Value, state: &mut TransformState, _now: Instant) -> VariationOutcome {
        let width64 = matches!(base, Value::Counter64(_));
        let base_value = state.counter_value.take().unwrap_or_else(|| base_as_i128(base));
        let next = base_value.saturating_add(self.delta as i128);
        let wrapped = if width64 {
            (next.rem_euclid(1i128 << 64)) as u64
        } else {
            (next.rem_euclid(1i128 << 32)) as u64
        };
        state.counter_value = Some(wrapped as i128);
        VariationOutcome::Value(rebuild(base, wrapped))
    }
}

fn base_as_i128(value: &Value) -> i128 {
    match value {
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) | Value::Uinteger32(v) => {
            *v as i128
        }
        Value::Counter64(v) => *v as i128,
        Value::Integer(v) => *v as i128,
        _ => 0,
    }
}

fn rebuild(base: &Value, wrapped: u64) -> Value {
    match base {
        Value::Counter32(_) => Value::Counter32(wrapped as u32),
        Value::Gauge32(_) => Value::Gauge32(wrapped as u32),
        Value::TimeTicks(_) => Value::TimeTicks(wrapped as u32),
        Value::Uinteger32(_) => Value::Uinteger32(wrapped as u32),
        Value::Counter64(_) => Value::Counter64(wrapped),
        Value::Integer(_) => Value::Integer(wrapped as i32),
        other => other.clone(),
    }
}

/// Adds a bounded pseudo-random offset in `[-max, max]`, deterministic given
/// `seed` and the OID's state slot (the RNG is reseeded per call from
/// `seed` mixed with the call count, so repeated runs with the same seed
/// produce the same sequence).
pub struct RandomJitter {
    pub max: u32,
    pub seed: u64,
}

impl Transform for RandomJitter {
    fn apply(&self, base: &Value, state: &mut TransformState, _now: Instant) -> VariationOutcome {
        let call_count = state.counter_value.unwrap_or(0);
        state.counter_value = Some(call_count + 1);
        let span = 2 * self.max as u64 + 1;
        let jitter = (splitmix64(self.seed.wrapping_add(call_count as u64)) % span) as i64
            - self.max as i64;
        let base_value = base_as_i128(base);
        let wrapped = base_value.saturating_add(jitter as i128).max(0) as u64;
        VariationOutcome::Value(rebuild(base, wrapped))
    }
}

/// xorshift-style mixer, deterministic and dependency-free.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Value steps by `delta` every `period`, computed as
/// `base + floor((now - first_seen) / period) * delta` so the value is a
/// pure function of elapsed time, not call count.
pub struct Step {
    pub period: Duration,
    pub delta: i64,
}

impl Transform for Step {
    fn apply(&self, base: &Value, state: &mut TransformState, now: Instant) -> VariationOutcome {
        let first_seen = *state.first_seen.get_or_insert(now);
        let elapsed = now.saturating_duration_since(first_seen);
        let steps = if self.period.is_zero() {
            0
        } else {
            (elapsed.as_secs_f64() / self.period.as_secs_f64()).floor() as i64
        };
        let base_value = base_as_i128(base);
        let next = base_value.saturating_add(steps as i128 * self.delta as i128);
        let wrapped = next.max(0) as u64;
        VariationOutcome::Value(rebuild(base, wrapped))
    }
}

/// A counter that increments by one on every read and snaps back to its
/// first-observed base value at each `period` boundary, simulating a
/// counter that periodically rolls over rather than one that free-runs.
pub struct PeriodicReset {
    pub period: Duration,
}

impl Transform for PeriodicReset {
    fn apply(&self, base: &Value, state: &mut TransformState, now: Instant) -> VariationOutcome {
        let last_reset = *state.last_reset.get_or_insert(now);
        if !self.period.is_zero() && now.saturating_duration_since(last_reset) >= self.period {
            state.last_reset = Some(now);
            state.counter_value = Some(0);
        }
        let count = state.counter_value.unwrap_or(0);
        state.counter_value = Some(count + 1);
        let base_value = base_as_i128(base);
        let wrapped = base_value.saturating_add(count).max(0) as u64;
        VariationOutcome::Value(rebuild(base, wrapped))
    }
}

/// Always removes the bound OID from responses, as if it didn't exist in
/// the dataset.
pub struct DropOid;

impl Transform for DropOid {
    fn apply(&self, _base: &Value, _state: &mut TransformState, _now: Instant) -> VariationOutcome {
        VariationOutcome::Drop
    }
}

/// Blocks the entire request for `delay` before the bound OID is considered
/// absent. The caller (the agent's request handler) is responsible for
/// actually sleeping; this transform only reports the intent.
pub struct Timeout {
    pub delay: Duration,
}

impl Transform for Timeout {
    fn apply(&self, _base: &Value, _state: &mut TransformState, _now: Instant) -> VariationOutcome {
        VariationOutcome::Timeout(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_monotonic_increments_and_wraps() {
        let t = CounterMonotonic { delta: 1 };
        let mut state = TransformState::default();
        let now = Instant::now();
        let base = Value::Counter32(u32::MAX);
        assert_eq!(t.apply(&base, &mut state, now), VariationOutcome::Value(Value::Counter32(0)));
        assert_eq!(t.apply(&base, &mut state, now), VariationOutcome::Value(Value::Counter32(1)));
    }

    #[test]
    fn step_is_pure_function_of_elapsed_time() {
        let t = Step {
            period: Duration::from_secs(10),
            delta: 5,
        };
        let mut state = TransformState::default();
        let t0 = Instant::now();
        let base = Value::Gauge32(100);
        assert_eq!(t.apply(&base, &mut state, t0), VariationOutcome::Value(Value::Gauge32(100)));
        let t1 = t0 + Duration::from_secs(25);
        assert_eq!(t.apply(&base, &mut state, t1), VariationOutcome::Value(Value::Gauge32(110)));
    }

    #[test]
    fn random_jitter_is_bounded_and_bidirectional() {
        let t = RandomJitter { max: 5, seed: 42 };
        let mut state = TransformState::default();
        let base = Value::Gauge32(1000);
        let mut min_seen = u32::MAX;
        let mut max_seen = 0u32;
        for _ in 0..200 {
            match t.apply(&base, &mut state, Instant::now()) {
                VariationOutcome::Value(Value::Gauge32(v)) => {
                    assert!((995..=1005).contains(&v));
                    min_seen = min_seen.min(v);
                    max_seen = max_seen.max(v);
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        // Over enough calls the jitter must land on both sides of the base,
        // not just add a non-negative offset.
        assert!(min_seen < 1000, "jitter never went below base: min={min_seen}");
        assert!(max_seen > 1000, "jitter never went above base: max={max_seen}");
    }

    #[test]
    fn random_jitter_deterministic_given_seed() {
        let base = Value::Gauge32(0);
        let t1 = RandomJitter { max: 1000, seed: 7 };
        let t2 = RandomJitter { max: 1000, seed: 7 };
        let mut s1 = TransformState::default();
        let mut s2 = TransformState::default();
        let now = Instant::now();
        assert_eq!(t1.apply(&base, &mut s1, now), t2.apply(&base, &mut s2, now));
    }

    #[test]
    fn drop_oid_always_drops() {
        let t = DropOid;
        let mut state = TransformState::default();
        assert_eq!(
            t.apply(&Value::Integer(0), &mut state, Instant::now()),
            VariationOutcome::Drop
        );
    }

    #[test]
    fn timeout_reports_delay_without_mutating_state() {
        let t = Timeout {
            delay: Duration::from_millis(250),
        };
        let mut state = TransformState::default();
        assert_eq!(
            t.apply(&Value::Integer(0), &mut state, Instant::now()),
            VariationOutcome::Timeout(Duration::from_millis(250))
        );
    }

    #[test]
    fn periodic_reset_increments_then_snaps_back_at_boundary() {
        let t = PeriodicReset {
            period: Duration::from_secs(60),
        };
        let mut state = TransformState::default();
        let base = Value::Gauge32(42);
        let t0 = Instant::now();

        // First read always returns the first-observed base.
        assert_eq!(
            t.apply(&base, &mut state, t0),
            VariationOutcome::Value(Value::Gauge32(42))
        );
        // Between resets the counter increments by one on every read.
        assert_eq!(
            t.apply(&base, &mut state, t0 + Duration::from_secs(10)),
            VariationOutcome::Value(Value::Gauge32(43))
        );
        assert_eq!(
            t.apply(&base, &mut state, t0 + Duration::from_secs(20)),
            VariationOutcome::Value(Value::Gauge32(44))
        );
        // Crossing the period boundary snaps back to the first-observed base.
        assert_eq!(
            t.apply(&base, &mut state, t0 + Duration::from_secs(61)),
            VariationOutcome::Value(Value::Gauge32(42))
        );
    }
}
