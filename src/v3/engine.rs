//! Authoritative/non-authoritative engine state and discovery (RFC 3414 §§2.3, 4).
//!
//! Two distinct roles use this module:
//!
//! - The authoritative side (an agent) owns an [`EngineState`]: a stable
//!   `engineID` plus a monotonically increasing `engineBoots`/`engineTime`
//!   clock used to validate incoming messages' time window and to answer
//!   discovery probes.
//! - The non-authoritative side (a client, e.g. the recorder) caches what it
//!   has learned about each target's engine in an [`EngineCache`] so it
//!   doesn't have to re-discover before every request.

use crate::message::decode_v3_header;
use crate::oid::Oid;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Instant;

/// Default `msgMaxSize` advertised by this implementation; comfortably under
/// the common Ethernet-path UDP ceiling so fragmented replies are unlikely.
pub const DEFAULT_MSG_MAX_SIZE: i32 = 2048;

/// Maximum representable `engineTime` before `engineBoots` must increment
/// (RFC 3414 §2.3: `0..2147483647`).
pub const MAX_ENGINE_TIME: i64 = 2_147_483_647;

/// Acceptable clock skew for the time-window check (RFC 3414 §3.2, step 7).
pub const TIME_WINDOW: i64 = 150;

/// `usmStats*.0` OIDs (RFC 3414 §5), the varbind carried in every USM Report
/// PDU identifying which counter was incremented.
pub mod usm_stats {
    /// `usmStatsUnsupportedSecLevels.0`
    pub const UNSUPPORTED_SEC_LEVELS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0];
    /// `usmStatsNotInTimeWindows.0`
    pub const NOT_IN_TIME_WINDOWS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0];
    /// `usmStatsUnknownUserNames.0`
    pub const UNKNOWN_USER_NAMES: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0];
    /// `usmStatsUnknownEngineIDs.0`
    pub const UNKNOWN_ENGINE_IDS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0];
    /// `usmStatsWrongDigests.0`
    pub const WRONG_DIGESTS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0];
    /// `usmStatsDecryptionErrors.0`
    pub const DECRYPTION_ERRORS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0];
}

fn oid_is(oid: &Oid, arcs: &[u32]) -> bool {
    oid.arcs() == arcs
}

/// Whether `oid` is the `usmStatsUnsupportedSecLevels.0` report varbind.
pub fn is_unsupported_sec_level_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::UNSUPPORTED_SEC_LEVELS)
}

/// Whether `oid` is the `usmStatsNotInTimeWindows.0` report varbind.
pub fn is_not_in_time_window_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::NOT_IN_TIME_WINDOWS)
}

/// Whether `oid` is the `usmStatsUnknownUserNames.0` report varbind.
pub fn is_unknown_user_name_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::UNKNOWN_USER_NAMES)
}

/// Whether `oid` is the `usmStatsUnknownEngineIDs.0` report varbind.
pub fn is_unknown_engine_id_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::UNKNOWN_ENGINE_IDS)
}

/// Whether `oid` is the `usmStatsWrongDigests.0` report varbind.
pub fn is_wrong_digest_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::WRONG_DIGESTS)
}

/// Whether `oid` is the `usmStatsDecryptionErrors.0` report varbind.
pub fn is_decryption_error_report(oid: &Oid) -> bool {
    oid_is(oid, usm_stats::DECRYPTION_ERRORS)
}

/// The authoritative engine's stable identity and boot clock.
///
/// `engineTime` is derived from wall-clock elapsed time since `self` was
/// constructed, rather than stored and ticked explicitly, since an agent
/// process's `engineBoots` only needs to increase across restarts (handled
/// by [`crate::v3::persist`]) and `engineTime` resets to zero each boot.
#[derive(Debug, Clone)]
pub struct EngineState {
    engine_id: Bytes,
    engine_boots: u32,
    started: Instant,
}

impl EngineState {
    /// Construct engine state with a given `engineBoots` (typically loaded
    /// from persistent storage and pre-incremented for this boot).
    pub fn new(engine_id: impl Into<Bytes>, engine_boots: u32) -> Self {
        Self {
            engine_id: engine_id.into(),
            engine_boots,
            started: Instant::now(),
        }
    }

    pub fn engine_id(&self) -> &Bytes {
        &self.engine_id
    }

    pub fn engine_boots(&self) -> u32 {
        self.engine_boots
    }

    /// Current `engineTime`: whole seconds since this state was constructed,
    /// saturating at [`MAX_ENGINE_TIME`] rather than wrapping (a real wrap
    /// would require bumping `engineBoots` and persisting it, which this
    /// process lifetime is never long enough to reach in practice).
    pub fn engine_time(&self) -> i32 {
        let secs = self.started.elapsed().as_secs() as i64;
        secs.min(MAX_ENGINE_TIME) as i32
    }

    /// RFC 3414 §3.2 step 7: the message is in the time window if
    /// `engineBoots` matches and `|localTime - msgTime| <= TIME_WINDOW`, or
    /// if the message's `engineBoots` is less than ours (stale, always
    /// rejected elsewhere) -- this function only judges the time component.
    pub fn check_time_window(&self, msg_boots: i32, msg_time: i32) -> bool {
        if msg_boots as u32 != self.engine_boots {
            return false;
        }
        let local = self.engine_time() as i64;
        (local - msg_time as i64).abs() <= TIME_WINDOW
    }
}

#[derive(Debug, Clone)]
struct CachedEngine {
    engine_id: Bytes,
    engine_boots: i32,
    engine_time: i32,
    recorded_at: Instant,
}

/// Per-target cache of discovered engine parameters, used by the
/// non-authoritative (client/recorder) side to skip discovery on every
/// request. Entries are advisory: the authoritative side always wins on a
/// mismatch (the caller re-discovers after an `unknownEngineID` report).
#[derive(Debug, Default)]
pub struct EngineCache {
    entries: Mutex<HashMap<SocketAddr, CachedEngine>>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the cached engine ID and an estimate of the current
    /// `engineTime` (adjusted by wall-clock elapsed since it was recorded).
    pub fn get(&self, target: SocketAddr) -> Option<(Bytes, i32, i32)> {
        let entries = self.entries.lock().unwrap();
        let cached = entries.get(&target)?;
        let elapsed = cached.recorded_at.elapsed().as_secs() as i64;
        let estimated_time = (cached.engine_time as i64 + elapsed).min(MAX_ENGINE_TIME) as i32;
        Some((cached.engine_id.clone(), cached.engine_boots, estimated_time))
    }

    pub fn update(&self, target: SocketAddr, engine_id: Bytes, engine_boots: i32, engine_time: i32) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            target,
            CachedEngine {
                engine_id,
                engine_boots,
                engine_time,
                recorded_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, target: SocketAddr) {
        self.entries.lock().unwrap().remove(&target);
    }
}

/// Extract `(engineID, engineBoots, engineTime)` from a discovery probe's
/// response (an unauthenticated Report PDU carrying `usmStatsNotInTimeWindows`
/// or simply the authoritative engine's security parameters).
pub fn parse_discovery_response(data: &[u8]) -> crate::error::Result<(Bytes, i32, i32)> {
    parse_discovery_response_with_limits(data, crate::ber::MAX_LENGTH)
}

/// As [`parse_discovery_response`], but rejecting messages larger than
/// `max_len` before parsing (defends a discovery listener against
/// oversized/garbage UDP payloads).
pub fn parse_discovery_response_with_limits(
    data: &[u8],
    max_len: usize,
) -> crate::error::Result<(Bytes, i32, i32)> {
    if data.len() > max_len {
        return Err(crate::error::Error::MessageTooLarge {
            size: data.len(),
            max: max_len,
        });
    }
    let (header, _) = decode_v3_header(Bytes::copy_from_slice(data))?;
    Ok((
        header.security_params.authoritative_engine_id,
        header.security_params.authoritative_engine_boots,
        header.security_params.authoritative_engine_time,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_accepts_matching_boots_within_window() {
        let state = EngineState::new(Bytes::from_static(b"engine"), 3);
        let now = state.engine_time();
        assert!(state.check_time_window(3, now));
        assert!(state.check_time_window(3, now - 100));
        assert!(!state.check_time_window(3, now - 200));
    }

    #[test]
    fn time_window_rejects_mismatched_boots() {
        let state = EngineState::new(Bytes::from_static(b"engine"), 3);
        let now = state.engine_time();
        assert!(!state.check_time_window(2, now));
        assert!(!state.check_time_window(4, now));
    }

    #[test]
    fn report_oid_classification() {
        assert!(is_not_in_time_window_report(&Oid::from_slice(
            usm_stats::NOT_IN_TIME_WINDOWS
        )));
        assert!(is_unknown_engine_id_report(&Oid::from_slice(
            usm_stats::UNKNOWN_ENGINE_IDS
        )));
        assert!(is_wrong_digest_report(&Oid::from_slice(usm_stats::WRONG_DIGESTS)));
        assert!(is_unknown_user_name_report(&Oid::from_slice(
            usm_stats::UNKNOWN_USER_NAMES
        )));
        assert!(is_unsupported_sec_level_report(&Oid::from_slice(
            usm_stats::UNSUPPORTED_SEC_LEVELS
        )));
        assert!(is_decryption_error_report(&Oid::from_slice(
            usm_stats::DECRYPTION_ERRORS
        )));
        assert!(!is_not_in_time_window_report(&Oid::from_slice(
            usm_stats::WRONG_DIGESTS
        )));
    }

    #[test]
    fn engine_cache_roundtrip() {
        let cache = EngineCache::new();
        let target: SocketAddr = "127.0.0.1:161".parse().unwrap();
        assert!(cache.get(target).is_none());
        cache.update(target, Bytes::from_static(b"engine-id"), 1, 500);
        let (id, boots, _time) = cache.get(target).unwrap();
        assert_eq!(&id[..], b"engine-id");
        assert_eq!(boots, 1);
        cache.invalidate(target);
        assert!(cache.get(target).is_none());
    }
}
