//! Shared test fixtures: well-known OIDs reused across integration tests.

use snmp_fleet::prelude::{Oid, oid};

// =============================================================================
// Standard system MIB OIDs (1.3.6.1.2.1.1.*)
// =============================================================================

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_object_id() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_contact() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 4, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_location() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}
pub fn sys_services() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 7, 0)
}

// =============================================================================
// Subtree roots (for walks)
// =============================================================================

/// System subtree root: 1.3.6.1.2.1.1
pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// Interfaces subtree root: 1.3.6.1.2.1.2
pub fn interfaces_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2)
}

// =============================================================================
// Test OIDs
// =============================================================================

/// Nonexistent OID for testing NoSuchObject/NoSuchInstance
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 99, 99, 99, 0)
}

// =============================================================================
// v3 test credentials
// =============================================================================

/// Auth password used by every v3 fixture user across these tests.
pub const AUTH_PASSWORD: &[u8] = b"authpass123";
/// Privacy password used by every v3 fixture user across these tests.
pub const PRIV_PASSWORD: &[u8] = b"privpass123";

/// V2c read community used by fixture agents.
pub const COMMUNITY_RO: &str = "public";

/// A stable test engine ID, in the RFC 3411 enterprise format this crate
/// generates for real agents (see `fleet::engine_id_for`).
pub fn test_engine_id() -> Vec<u8> {
    vec![0x80, 0x00, 0x1f, 0x88, 0x80, b't', b'e', b's', b't']
}
