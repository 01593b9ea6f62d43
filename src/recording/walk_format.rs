//! Parses the two `snmpwalk`-style alternate input forms accepted when
//! building a dataset: numeric walk output (`.1.3.6.1.2.1.1.1.0 = STRING:
//! "..."`) and named walk output (`SNMPv2-MIB::sysDescr.0 = STRING: ...`).
//!
//! Grounded on the line-oriented, `=`-delimited shape of real `snmpwalk`
//! output; the named form is resolved through [`super::mib_names`].

use crate::error::{ConfigErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Value;
use bytes::Bytes;

/// One parsed walk-output line.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkEntry {
    pub oid: Oid,
    pub value: Value,
}

/// Parse a single line in either walk form. Returns `None` for blank lines
/// or lines that don't contain the `=` separator (treated as non-data, the
/// way `snmpwalk` output can carry banner/error lines on stderr that a
/// naive capture sometimes interleaves).
pub fn parse_line(line: &str) -> Result<Option<WalkEntry>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some((oid_part, rest)) = line.split_once('=') else {
        return Ok(None);
    };
    let oid_part = oid_part.trim();
    let rest = rest.trim();

    let oid = parse_oid_part(oid_part)?;
    let value = parse_typed_value(rest)?;
    Ok(Some(WalkEntry { oid, value }))
}

fn parse_oid_part(part: &str) -> Result<Oid> {
    if part.starts_with('.') || part.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Oid::parse(part);
    }

    // Named form: MIB::object[.index...]
    let Some((mib, remainder)) = part.split_once("::") else {
        return Err(Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("unrecognized OID reference: {part}"),
        }));
    };
    let (object, index) = match remainder.split_once('.') {
        Some((object, index)) => (object, Some(index)),
        None => (remainder, None),
    };

    let base = super::mib_names::resolve(mib, object).ok_or_else(|| {
        Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("unknown MIB symbol {mib}::{object}"),
        })
    })?;

    match index {
        Some(index) => {
            let mut full = base.to_vec();
            for arc in index.split('.') {
                let arc: u32 = arc.parse().map_err(|_| {
                    Error::config(ConfigErrorKind::InvalidYaml {
                        detail: format!("invalid instance index in {part}"),
                    })
                })?;
                full.push(arc);
            }
            Ok(Oid::from_vec(full))
        }
        None => Ok(Oid::from_vec(base.to_vec())),
    }
}

fn parse_typed_value(rest: &str) -> Result<Value> {
    let Some((ty, value)) = rest.split_once(':') else {
        return Err(Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("missing TYPE: value separator in '{rest}'"),
        }));
    };
    let ty = ty.trim();
    let value = value.trim();
    let unquoted = value.trim_matches('"');

    Ok(match ty {
        "STRING" => Value::from(unquoted),
        "Hex-STRING" => {
            let bytes = decode_hex_groups(unquoted)?;
            Value::OctetString(Bytes::from(bytes))
        }
        "INTEGER" => Value::Integer(parse_int(value, unquoted)?),
        "OID" => Value::ObjectIdentifier(Oid::parse(unquoted)?),
        "IpAddress" => Value::IpAddress(parse_ip(unquoted)?),
        "Counter32" | "Counter" => Value::Counter32(parse_u32(unquoted)?),
        "Gauge32" | "Gauge" | "Unsigned32" => Value::Gauge32(parse_u32(unquoted)?),
        "Timeticks" => Value::TimeTicks(parse_timeticks(unquoted)?),
        "Opaque" => Value::Opaque(Bytes::from(decode_hex_groups(unquoted)?)),
        "Counter64" => Value::Counter64(unquoted.parse().map_err(|_| {
            Error::config(ConfigErrorKind::InvalidYaml {
                detail: format!("invalid Counter64 value: {unquoted}"),
            })
        })?),
        "Network Address" | "NetworkAddress" => Value::IpAddress(parse_ip(unquoted)?),
        "No Such Object available on this agent at this OID" | "noSuchObject" => {
            Value::NoSuchObject
        }
        "No Such Instance currently exists at this OID" | "noSuchInstance" => {
            Value::NoSuchInstance
        }
        "No more variables left in this MIB View" | "endOfMibView" => Value::EndOfMibView,
        other => {
            return Err(Error::config(ConfigErrorKind::InvalidYaml {
                detail: format!("unrecognized walk-output type token: {other}"),
            }));
        }
    })
}

fn parse_int(original: &str, unquoted: &str) -> Result<i32> {
    // Enumerated display form is "Name(3)"; fall back to the parenthesized
    // number when the bare value doesn't parse.
    if let Ok(v) = unquoted.parse() {
        return Ok(v);
    }
    if let Some(start) = original.rfind('(') {
        if let Some(end) = original[start..].find(')') {
            if let Ok(v) = original[start + 1..start + end].parse() {
                return Ok(v);
            }
        }
    }
    Err(Error::config(ConfigErrorKind::InvalidYaml {
        detail: format!("invalid INTEGER value: {original}"),
    }))
}

fn parse_u32(s: &str) -> Result<u32> {
    s.parse().map_err(|_| {
        Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("invalid unsigned value: {s}"),
        })
    })
}

fn parse_timeticks(s: &str) -> Result<u32> {
    // Accept either a bare number or the "(123) 0:00:01.23" display form.
    if let Ok(v) = s.parse() {
        return Ok(v);
    }
    if let Some(rest) = s.strip_prefix('(') {
        if let Some(end) = rest.find(')') {
            return parse_u32(&rest[..end]);
        }
    }
    Err(Error::config(ConfigErrorKind::InvalidYaml {
        detail: format!("invalid Timeticks value: {s}"),
    }))
}

fn parse_ip(s: &str) -> Result<[u8; 4]> {
    let mut octets = [0u8; 4];
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return Err(Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("invalid IpAddress value: {s}"),
        }));
    }
    for (i, part) in parts.iter().enumerate() {
        octets[i] = part.parse().map_err(|_| {
            Error::config(ConfigErrorKind::InvalidYaml {
                detail: format!("invalid IpAddress value: {s}"),
            })
        })?;
    }
    Ok(octets)
}

fn decode_hex_groups(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.split_whitespace().collect();
    crate::util::decode_hex(&compact).map_err(|_| {
        Error::config(ConfigErrorKind::InvalidYaml {
            detail: format!("invalid hex string: {s}"),
        })
    })
}
