//! A tiny built-in symbol table for the named-walk recording form
//! (`SNMPv2-MIB::sysDescr.0 = STRING: ...`), covering the handful of MIBs
//! that show up in hand-written recordings and `snmpwalk -O n` output.
//!
//! Not a MIB compiler: just enough of SNMPv2-MIB and IF-MIB to resolve the
//! symbols that appear in practice. Unresolvable symbols are a load error,
//! not a silent skip, since a typo'd symbol would otherwise vanish from the
//! dataset with no diagnostic.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Resolve `<MIB>::<object>` to its base OID arcs (without any trailing
/// instance index, which the caller appends separately).
pub fn resolve(mib: &str, object: &str) -> Option<&'static [u32]> {
    table().get(&(mib, object)).copied()
}

fn table() -> &'static HashMap<(&'static str, &'static str), &'static [u32]> {
    static TABLE: OnceLock<HashMap<(&'static str, &'static str), &'static [u32]>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        // SNMPv2-MIB
        m.insert(("SNMPv2-MIB", "sysDescr"), &[1, 3, 6, 1, 2, 1, 1, 1][..]);
        m.insert(("SNMPv2-MIB", "sysObjectID"), &[1, 3, 6, 1, 2, 1, 1, 2][..]);
        m.insert(("SNMPv2-MIB", "sysUpTime"), &[1, 3, 6, 1, 2, 1, 1, 3][..]);
        m.insert(("SNMPv2-MIB", "sysContact"), &[1, 3, 6, 1, 2, 1, 1, 4][..]);
        m.insert(("SNMPv2-MIB", "sysName"), &[1, 3, 6, 1, 2, 1, 1, 5][..]);
        m.insert(("SNMPv2-MIB", "sysLocation"), &[1, 3, 6, 1, 2, 1, 1, 6][..]);
        m.insert(("SNMPv2-MIB", "sysServices"), &[1, 3, 6, 1, 2, 1, 1, 7][..]);
        m.insert(("SNMPv2-MIB", "sysORLastChange"), &[1, 3, 6, 1, 2, 1, 1, 8][..]);

        // IF-MIB
        m.insert(("IF-MIB", "ifNumber"), &[1, 3, 6, 1, 2, 1, 2, 1][..]);
        m.insert(("IF-MIB", "ifIndex"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 1][..]);
        m.insert(("IF-MIB", "ifDescr"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2][..]);
        m.insert(("IF-MIB", "ifType"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 3][..]);
        m.insert(("IF-MIB", "ifMtu"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 4][..]);
        m.insert(("IF-MIB", "ifSpeed"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5][..]);
        m.insert(("IF-MIB", "ifPhysAddress"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 6][..]);
        m.insert(("IF-MIB", "ifAdminStatus"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 7][..]);
        m.insert(("IF-MIB", "ifOperStatus"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8][..]);
        m.insert(("IF-MIB", "ifInOctets"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10][..]);
        m.insert(("IF-MIB", "ifOutOctets"), &[1, 3, 6, 1, 2, 1, 2, 2, 1, 16][..]);
        m.insert(("IF-MIB", "ifHCInOctets"), &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 6][..]);
        m.insert(("IF-MIB", "ifHCOutOctets"), &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 10][..]);
        m.insert(("IF-MIB", "ifName"), &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1][..]);
        m.insert(("IF-MIB", "ifHighSpeed"), &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 15][..]);

        // IP-MIB
        m.insert(("IP-MIB", "ipForwarding"), &[1, 3, 6, 1, 2, 1, 4, 1][..]);
        m.insert(("IP-MIB", "ipDefaultTTL"), &[1, 3, 6, 1, 2, 1, 4, 2][..]);
        m.insert(("IP-MIB", "ipInReceives"), &[1, 3, 6, 1, 2, 1, 4, 3][..]);
        m.insert(("IP-MIB", "ipInDelivers"), &[1, 3, 6, 1, 2, 1, 4, 9][..]);
        m.insert(("IP-MIB", "ipOutRequests"), &[1, 3, 6, 1, 2, 1, 4, 10][..]);
        m.insert(("IP-MIB", "ipAdEntAddr"), &[1, 3, 6, 1, 2, 1, 4, 20, 1, 1][..]);
        m.insert(("IP-MIB", "ipAdEntIfIndex"), &[1, 3, 6, 1, 2, 1, 4, 20, 1, 2][..]);
        m.insert(("IP-MIB", "ipAdEntNetMask"), &[1, 3, 6, 1, 2, 1, 4, 20, 1, 3][..]);

        // TCP-MIB
        m.insert(("TCP-MIB", "tcpRtoAlgorithm"), &[1, 3, 6, 1, 2, 1, 6, 1][..]);
        m.insert(("TCP-MIB", "tcpActiveOpens"), &[1, 3, 6, 1, 2, 1, 6, 5][..]);
        m.insert(("TCP-MIB", "tcpPassiveOpens"), &[1, 3, 6, 1, 2, 1, 6, 6][..]);
        m.insert(("TCP-MIB", "tcpCurrEstab"), &[1, 3, 6, 1, 2, 1, 6, 9][..]);
        m.insert(("TCP-MIB", "tcpInSegs"), &[1, 3, 6, 1, 2, 1, 6, 10][..]);
        m.insert(("TCP-MIB", "tcpOutSegs"), &[1, 3, 6, 1, 2, 1, 6, 11][..]);
        m.insert(("TCP-MIB", "tcpConnState"), &[1, 3, 6, 1, 2, 1, 6, 13, 1, 1][..]);
        m.insert(("TCP-MIB", "tcpConnLocalAddress"), &[1, 3, 6, 1, 2, 1, 6, 13, 1, 2][..]);
        m.insert(("TCP-MIB", "tcpConnLocalPort"), &[1, 3, 6, 1, 2, 1, 6, 13, 1, 3][..]);

        // UDP-MIB
        m.insert(("UDP-MIB", "udpInDatagrams"), &[1, 3, 6, 1, 2, 1, 7, 1][..]);
        m.insert(("UDP-MIB", "udpNoPorts"), &[1, 3, 6, 1, 2, 1, 7, 2][..]);
        m.insert(("UDP-MIB", "udpOutDatagrams"), &[1, 3, 6, 1, 2, 1, 7, 4][..]);
        m.insert(("UDP-MIB", "udpLocalAddress"), &[1, 3, 6, 1, 2, 1, 7, 5, 1, 1][..]);
        m.insert(("UDP-MIB", "udpLocalPort"), &[1, 3, 6, 1, 2, 1, 7, 5, 1, 2][..]);

        // SNMPv2-MIB, snmp group
        m.insert(("SNMPv2-MIB", "snmpInPkts"), &[1, 3, 6, 1, 2, 1, 11, 1][..]);
        m.insert(("SNMPv2-MIB", "snmpOutPkts"), &[1, 3, 6, 1, 2, 1, 11, 2][..]);
        m.insert(("SNMPv2-MIB", "snmpInBadVersions"), &[1, 3, 6, 1, 2, 1, 11, 3][..]);
        m.insert(("SNMPv2-MIB", "snmpInBadCommunityNames"), &[1, 3, 6, 1, 2, 1, 11, 4][..]);
        m.insert(("SNMPv2-MIB", "snmpInASNParseErrs"), &[1, 3, 6, 1, 2, 1, 11, 6][..]);
        m.insert(("SNMPv2-MIB", "snmpEnableAuthenTraps"), &[1, 3, 6, 1, 2, 1, 11, 30][..]);

        m
    })
}
