//! SNMP value types (ASN.1 + SMI application types).

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;
use std::fmt;

/// An SNMP variable value.
///
/// Covers the ASN.1 universal types used by SNMP plus the SMIv2
/// application types (Counter32, Gauge32/Unsigned32, TimeTicks, Opaque,
/// Counter64) and the three context-tagged exception values used in
/// GET/GETNEXT/GETBULK responses.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    OctetString(Bytes),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    /// Unsigned32, wire-identical to Gauge32 (tag 0x42); kept distinct so
    /// callers that care about SMI intent (e.g. the variation engine's
    /// negative-clamp transform) don't have to guess from context.
    Uinteger32(u32),
    TimeTicks(u32),
    Opaque(Bytes),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// A recognized-but-unhandled tag, preserved verbatim.
    Unknown { tag: u8, data: Bytes },
}

impl Value {
    /// Whether this is one of the three GET/GETNEXT exception values.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// The BER tag this value encodes under.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Integer(_) => tag::universal::INTEGER,
            Value::OctetString(_) => tag::universal::OCTET_STRING,
            Value::Null => tag::universal::NULL,
            Value::ObjectIdentifier(_) => tag::universal::OBJECT_IDENTIFIER,
            Value::IpAddress(_) => tag::application::IP_ADDRESS,
            Value::Counter32(_) => tag::application::COUNTER32,
            Value::Gauge32(_) | Value::Uinteger32(_) => tag::application::GAUGE32,
            Value::TimeTicks(_) => tag::application::TIMETICKS,
            Value::Opaque(_) => tag::application::OPAQUE,
            Value::Counter64(_) => tag::application::COUNTER64,
            Value::NoSuchObject => tag::context::NO_SUCH_OBJECT,
            Value::NoSuchInstance => tag::context::NO_SUCH_INSTANCE,
            Value::EndOfMibView => tag::context::END_OF_MIB_VIEW,
            Value::Unknown { tag, .. } => *tag,
        }
    }

    /// Encode this value's TLV into `buf`.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        match self {
            Value::Integer(v) => buf.push_integer(*v),
            Value::OctetString(bytes) => buf.push_octet_string(bytes),
            Value::Null => buf.push_null(),
            Value::ObjectIdentifier(oid) => buf.push_oid(oid),
            Value::IpAddress(addr) => buf.push_ip_address(*addr),
            Value::Counter32(v) => buf.push_unsigned32(tag::application::COUNTER32, *v),
            Value::Gauge32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::Uinteger32(v) => buf.push_unsigned32(tag::application::GAUGE32, *v),
            Value::TimeTicks(v) => buf.push_unsigned32(tag::application::TIMETICKS, *v),
            Value::Opaque(bytes) => {
                buf.push_bytes(bytes);
                buf.push_length(bytes.len());
                buf.push_tag(tag::application::OPAQUE);
            }
            Value::Counter64(v) => buf.push_integer64(*v),
            Value::NoSuchObject => {
                buf.push_length(0);
                buf.push_tag(tag::context::NO_SUCH_OBJECT);
            }
            Value::NoSuchInstance => {
                buf.push_length(0);
                buf.push_tag(tag::context::NO_SUCH_INSTANCE);
            }
            Value::EndOfMibView => {
                buf.push_length(0);
                buf.push_tag(tag::context::END_OF_MIB_VIEW);
            }
            Value::Unknown { tag, data } => {
                buf.push_bytes(data);
                buf.push_length(data.len());
                buf.push_tag(*tag);
            }
        }
    }

    /// Decode a value TLV from the decoder.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let t = decoder.peek_tag()?;
        Ok(match t {
            tag::universal::INTEGER => Value::Integer(decoder.read_integer()?),
            tag::universal::OCTET_STRING => Value::OctetString(decoder.read_octet_string()?),
            tag::universal::NULL => {
                decoder.read_null()?;
                Value::Null
            }
            tag::universal::OBJECT_IDENTIFIER => Value::ObjectIdentifier(decoder.read_oid()?),
            tag::application::IP_ADDRESS => Value::IpAddress(decoder.read_ip_address()?),
            tag::application::COUNTER32 => {
                Value::Counter32(decoder.read_unsigned32(tag::application::COUNTER32)?)
            }
            tag::application::GAUGE32 => {
                Value::Gauge32(decoder.read_unsigned32(tag::application::GAUGE32)?)
            }
            tag::application::TIMETICKS => {
                Value::TimeTicks(decoder.read_unsigned32(tag::application::TIMETICKS)?)
            }
            tag::application::OPAQUE => {
                let (_, data) = decoder.read_unknown()?;
                Value::Opaque(data)
            }
            tag::application::COUNTER64 => Value::Counter64(decoder.read_counter64()?),
            tag::context::NO_SUCH_OBJECT => {
                let (_, data) = decoder.read_unknown()?;
                if !data.is_empty() {
                    return Err(Error::decode(decoder.offset(), DecodeErrorKind::InvalidLength));
                }
                Value::NoSuchObject
            }
            tag::context::NO_SUCH_INSTANCE => {
                let (_, data) = decoder.read_unknown()?;
                if !data.is_empty() {
                    return Err(Error::decode(decoder.offset(), DecodeErrorKind::InvalidLength));
                }
                Value::NoSuchInstance
            }
            tag::context::END_OF_MIB_VIEW => {
                let (_, data) = decoder.read_unknown()?;
                if !data.is_empty() {
                    return Err(Error::decode(decoder.offset(), DecodeErrorKind::InvalidLength));
                }
                Value::EndOfMibView
            }
            other => {
                let (_, data) = decoder.read_unknown()?;
                Value::Unknown { tag: other, data }
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(bytes) => {
                if let Ok(s) = std::str::from_utf8(bytes) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:02x?}", &bytes[..])
                }
            }
            Value::Null => write!(f, "NULL"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress(a) => write!(f, "{}.{}.{}.{}", a[0], a[1], a[2], a[3]),
            Value::Counter32(v) => write!(f, "{}", v),
            Value::Gauge32(v) => write!(f, "{}", v),
            Value::Uinteger32(v) => write!(f, "{}", v),
            Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Opaque(bytes) => write!(f, "{:02x?}", &bytes[..]),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
            Value::Unknown { tag, .. } => write!(f, "unknown(0x{:02X})", tag),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::OctetString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::OctetString(Bytes::from(s.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn roundtrip(value: Value) {
        let mut buf = EncodeBuf::new();
        value.encode(&mut buf);
        let bytes = buf.finish();
        let mut decoder = Decoder::new(bytes);
        let decoded = Value::decode(&mut decoder).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn roundtrip_all_variants() {
        roundtrip(Value::Integer(-42));
        roundtrip(Value::OctetString(Bytes::from_static(b"hello")));
        roundtrip(Value::Null);
        roundtrip(Value::ObjectIdentifier(oid!(1, 3, 6, 1, 2, 1)));
        roundtrip(Value::IpAddress([10, 0, 0, 1]));
        roundtrip(Value::Counter32(u32::MAX));
        roundtrip(Value::Gauge32(12345));
        roundtrip(Value::TimeTicks(987654));
        roundtrip(Value::Opaque(Bytes::from_static(&[1, 2, 3])));
        roundtrip(Value::Counter64(u64::MAX));
        roundtrip(Value::NoSuchObject);
        roundtrip(Value::NoSuchInstance);
        roundtrip(Value::EndOfMibView);
    }

    #[test]
    fn uinteger32_shares_gauge32_wire_tag() {
        let mut buf = EncodeBuf::new();
        Value::Uinteger32(7).encode(&mut buf);
        let bytes = buf.finish();
        let mut decoder = Decoder::new(bytes);
        // Decodes back as Gauge32 since the wire tag is identical; callers
        // that need Uinteger32 semantics track that out-of-band.
        assert_eq!(Value::decode(&mut decoder).unwrap(), Value::Gauge32(7));
    }

    #[test]
    fn display_exceptions() {
        assert_eq!(Value::NoSuchObject.to_string(), "noSuchObject");
        assert_eq!(Value::NoSuchInstance.to_string(), "noSuchInstance");
        assert_eq!(Value::EndOfMibView.to_string(), "endOfMibView");
    }

    #[test]
    fn is_exception() {
        assert!(Value::NoSuchObject.is_exception());
        assert!(!Value::Integer(0).is_exception());
    }
}
