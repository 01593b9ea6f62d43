//! `.snmprec` recording file format: the primary way a dataset is
//! populated from disk.
//!
//! Grounded on the snmpsim-style recording convention (`oid|type|value`,
//! one row per line, `#` comment lines) with named, case-insensitive type
//! strings rather than snmpsim's original numeric codes, combined with the
//! teacher's `util::decode_hex`/`encode_hex` helpers for the hex-string
//! `opaque`/`nsapaddress`/`bits` variants. The two `snmpwalk`-output
//! alternate forms live in [`walk_format`]; this module owns the native
//! `.snmprec` line format, template expansion, and top-level file loading.

pub mod mib_names;
pub mod walk_format;

use crate::error::{ConfigErrorKind, Error, Result};
use crate::oid::Oid;
use crate::store::MibStore;
use crate::value::Value;
use bytes::Bytes;
use std::path::Path;

/// A single parsed `.snmprec` row, before template expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub oid: Oid,
    pub value: Value,
    /// Optional routing restriction parsed from an `@<deviceID>` or
    /// `@<port>` suffix on the value field (a bare numeric suffix is a
    /// port, anything else a device name); `None` means the row applies
    /// regardless of which agent loads this file.
    pub routing: Option<RoutingTag>,
}

/// Parsed `@routing` suffix restricting which agent a row applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingTag {
    Device(String),
    Port(u16),
}

/// The `<type>` field of a `.snmprec` row: one of the named SMI type
/// strings, case-insensitive, with a handful of short aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeTag {
    Integer,
    OctetString,
    ObjectIdentifier,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
    NsapAddress,
    Bits,
    Null,
}

impl TypeTag {
    fn parse(field: &str) -> Option<Self> {
        Some(match field.to_ascii_lowercase().as_str() {
            "integer" | "int" => TypeTag::Integer,
            "octetstring" | "string" | "s" => TypeTag::OctetString,
            "objectidentifier" | "oid" | "o" => TypeTag::ObjectIdentifier,
            "ipaddress" | "ip" => TypeTag::IpAddress,
            "counter32" | "c32" => TypeTag::Counter32,
            "gauge32" => TypeTag::Gauge32,
            "timeticks" | "tt" => TypeTag::TimeTicks,
            "opaque" => TypeTag::Opaque,
            "counter64" | "c64" => TypeTag::Counter64,
            "nsapaddress" => TypeTag::NsapAddress,
            "bits" => TypeTag::Bits,
            "null" => TypeTag::Null,
            _ => return None,
        })
    }
}

/// Parse the full text of a `.snmprec` file into records, expanding any
/// `|#start-end` template rows along the way.
///
/// Blank lines and lines starting with `#` (after trimming) are skipped.
/// Later rows with a duplicate OID win over earlier ones when the records
/// are loaded into a [`MibStore`], matching `MibStore::sort_and_dedupe`.
pub fn parse_str(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        parse_line(trimmed, lineno + 1, &mut records)?;
    }
    Ok(records)
}

/// Load and parse a `.snmprec` file from disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|_| {
        Error::config(ConfigErrorKind::NotFound {
            path: path.display().to_string(),
        })
    })?;
    parse_str(&text)
}

/// Build a [`MibStore`] from records, applying the optional routing filter:
/// a record tagged for a different device/port is skipped, and untagged
/// records are always kept.
pub fn build_store(records: &[Record], device: Option<&str>, port: Option<u16>) -> MibStore {
    let mut store = MibStore::new();
    let filtered = records.iter().filter(|r| match &r.routing {
        None => true,
        Some(RoutingTag::Device(name)) => Some(name.as_str()) == device,
        Some(RoutingTag::Port(p)) => Some(*p) == port,
    });
    store.bulk_insert(filtered.map(|r| (r.oid.clone(), r.value.clone())));
    store
}

/// Render records back to `.snmprec` text, one row per line, in the order
/// given. The recorder writes records in walk order, so this performs no
/// sorting or deduplication of its own.
pub fn serialize(records: &[Record]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.oid.to_string());
        out.push('|');
        out.push_str(type_tag_str(&record.value));
        out.push('|');
        out.push_str(&format_value(&record.value));
        if let Some(tag) = &record.routing {
            out.push('@');
            match tag {
                RoutingTag::Device(name) => out.push_str(name),
                RoutingTag::Port(port) => out.push_str(&port.to_string()),
            }
        }
        out.push('\n');
    }
    out
}

fn type_tag_str(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::OctetString(_) => "octetstring",
        Value::Null => "null",
        Value::ObjectIdentifier(_) => "objectidentifier",
        Value::IpAddress(_) => "ipaddress",
        Value::Counter32(_) => "counter32",
        Value::Gauge32(_) | Value::Uinteger32(_) => "gauge32",
        Value::TimeTicks(_) => "timeticks",
        Value::Opaque(_) => "opaque",
        Value::Counter64(_) => "counter64",
        // Exceptions and unknown tags never round-trip through a recording;
        // a dataset never legitimately holds them as stored values.
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView | Value::Unknown { .. } => "octetstring",
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::OctetString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Opaque(bytes) => crate::util::encode_hex(bytes),
        Value::Unknown { data, .. } => crate::util::encode_hex(data),
        Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => String::new(),
        other => other.to_string(),
    }
}

fn parse_line(line: &str, lineno: usize, out: &mut Vec<Record>) -> Result<()> {
    let fields: Vec<&str> = line.splitn(4, '|').collect();
    if fields.len() < 3 {
        return Err(malformed(lineno, "expected at least 3 pipe-separated fields"));
    }
    let oid_field = fields[0];
    let type_field = fields[1];
    let value_field = fields[2];
    let template_field = fields.get(3).copied();

    match template_field {
        None => {
            let (value, routing) = parse_value_and_routing(type_field, value_field, lineno)?;
            let oid = Oid::parse(oid_field)
                .map_err(|_| malformed(lineno, &format!("invalid OID: {oid_field}")))?;
            out.push(Record { oid, value, routing });
        }
        Some(template) => {
            let (start, end) = parse_template_range(template, lineno)?;
            for row in start..=end {
                let oid_str = oid_field.replace('#', &row.to_string());
                let value_str = value_field.replace('#', &row.to_string());
                let (value, routing) = parse_value_and_routing(type_field, &value_str, lineno)?;
                let oid = Oid::parse(&oid_str)
                    .map_err(|_| malformed(lineno, &format!("invalid OID: {oid_str}")))?;
                out.push(Record { oid, value, routing });
            }
        }
    }
    Ok(())
}

fn parse_template_range(template: &str, lineno: usize) -> Result<(u32, u32)> {
    let template = template
        .strip_prefix('#')
        .ok_or_else(|| malformed(lineno, "template field must start with '#'"))?;
    let (start, end) = template
        .split_once('-')
        .ok_or_else(|| malformed(lineno, "template field must be '#start-end'"))?;
    let start: u32 = start
        .parse()
        .map_err(|_| malformed(lineno, "invalid template start"))?;
    let end: u32 = end
        .parse()
        .map_err(|_| malformed(lineno, "invalid template end"))?;
    if start > end {
        return Err(malformed(lineno, "template start must be <= end"));
    }
    Ok((start, end))
}

fn parse_value_and_routing(
    type_field: &str,
    value_field: &str,
    lineno: usize,
) -> Result<(Value, Option<RoutingTag>)> {
    let (raw_value, routing) = match value_field.rsplit_once('@') {
        Some((value, tag)) => (value, Some(parse_routing_tag(tag, lineno)?)),
        None => (value_field, None),
    };
    let value = parse_typed_value(type_field, raw_value, lineno)?;
    Ok((value, routing))
}

/// `...@<port>` is a bare numeric destination port; anything else is a
/// device name (spec §6.1: "priority port > device > default").
fn parse_routing_tag(tag: &str, _lineno: usize) -> Result<RoutingTag> {
    match tag.parse::<u16>() {
        Ok(port) => Ok(RoutingTag::Port(port)),
        Err(_) => Ok(RoutingTag::Device(tag.to_string())),
    }
}

fn parse_typed_value(type_field: &str, value: &str, lineno: usize) -> Result<Value> {
    let tag = TypeTag::parse(type_field)
        .ok_or_else(|| malformed(lineno, &format!("unknown type: {type_field}")))?;

    Ok(match tag {
        TypeTag::Integer => Value::Integer(
            value
                .parse()
                .map_err(|_| malformed(lineno, &format!("invalid integer: {value}")))?,
        ),
        TypeTag::OctetString => Value::from(value),
        TypeTag::Null => Value::Null,
        TypeTag::ObjectIdentifier => Value::ObjectIdentifier(
            Oid::parse(value).map_err(|_| malformed(lineno, &format!("invalid oid value: {value}")))?,
        ),
        TypeTag::IpAddress => Value::IpAddress(parse_ip(value, lineno)?),
        TypeTag::Counter32 => Value::Counter32(
            value
                .parse()
                .map_err(|_| malformed(lineno, &format!("invalid counter32: {value}")))?,
        ),
        TypeTag::Gauge32 => Value::Gauge32(
            value
                .parse()
                .map_err(|_| malformed(lineno, &format!("invalid gauge32: {value}")))?,
        ),
        TypeTag::TimeTicks => Value::TimeTicks(
            value
                .parse()
                .map_err(|_| malformed(lineno, &format!("invalid timeticks: {value}")))?,
        ),
        TypeTag::Opaque => {
            let bytes = crate::util::decode_hex(value)
                .map_err(|_| malformed(lineno, &format!("invalid opaque hex: {value}")))?;
            Value::Opaque(Bytes::from(bytes))
        }
        TypeTag::Counter64 => Value::Counter64(
            value
                .parse()
                .map_err(|_| malformed(lineno, &format!("invalid counter64: {value}")))?,
        ),
        // Neither has a dedicated wire tag in this agent's value model; both
        // are carried as opaque byte strings, hex-encoded on disk like Opaque.
        TypeTag::NsapAddress | TypeTag::Bits => {
            let bytes = crate::util::decode_hex(value)
                .map_err(|_| malformed(lineno, &format!("invalid hex value: {value}")))?;
            Value::OctetString(Bytes::from(bytes))
        }
    })
}

fn parse_ip(value: &str, lineno: usize) -> Result<[u8; 4]> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 4 {
        return Err(malformed(lineno, &format!("invalid IpAddress: {value}")));
    }
    let mut octets = [0u8; 4];
    for (i, p) in parts.iter().enumerate() {
        octets[i] = p
            .parse()
            .map_err(|_| malformed(lineno, &format!("invalid IpAddress: {value}")))?;
    }
    Ok(octets)
}

fn malformed(lineno: usize, detail: &str) -> Error {
    Error::config(ConfigErrorKind::InvalidYaml {
        detail: format!("line {lineno}: {detail}"),
    })
}
