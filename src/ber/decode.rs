//! BER decoding.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// Cursor over a BER-encoded buffer.
///
/// A `Decoder` created by [`Decoder::read_sequence`] is a view over just
/// that sequence's content octets; reading past its end returns
/// [`DecodeErrorKind::TruncatedData`] even if the parent buffer has more
/// data after the sequence.
#[derive(Debug, Clone)]
pub struct Decoder {
    data: Bytes,
    /// Absolute offset of `data[0]` within the original message, used only
    /// for error reporting.
    base_offset: usize,
    pos: usize,
}

impl Decoder {
    /// Create a decoder over a full message buffer.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            base_offset: 0,
            pos: 0,
        }
    }

    /// Number of unconsumed bytes remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all content has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Current absolute offset within the original message, for error
    /// reporting by callers decoding values on top of this cursor.
    pub fn offset(&self) -> usize {
        self.base_offset + self.pos
    }

    fn err(&self, kind: DecodeErrorKind) -> Error {
        Error::decode(self.offset(), kind)
    }

    /// Peek at the next tag byte without consuming it.
    pub fn peek_tag(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.err(DecodeErrorKind::TruncatedData))
    }

    /// Read a tag/length header and return the content bytes plus the
    /// absolute offset at which they start, advancing past the header and
    /// the content.
    fn read_tlv_at(&mut self, expected_tag: u8) -> Result<(Bytes, usize)> {
        let actual = self.peek_tag()?;
        if actual != expected_tag {
            return Err(self.err(DecodeErrorKind::UnexpectedTag {
                expected: expected_tag,
                actual,
            }));
        }
        self.pos += 1;

        let (len, consumed) = decode_length(&self.data[self.pos..], self.offset())?;
        self.pos += consumed;

        if self.pos + len > self.data.len() {
            return Err(self.err(DecodeErrorKind::InsufficientData {
                needed: len,
                available: self.data.len() - self.pos,
            }));
        }

        let content_offset = self.offset();
        let content = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok((content, content_offset))
    }

    /// Read a tag/length header and return the content bytes, advancing
    /// past the header and the content.
    fn read_tlv(&mut self, expected_tag: u8) -> Result<Bytes> {
        self.read_tlv_at(expected_tag).map(|(content, _)| content)
    }

    /// Read a SEQUENCE header, returning a decoder scoped to its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        let (content, content_offset) = self.read_tlv_at(tag::universal::SEQUENCE)?;
        Ok(Decoder {
            data: content,
            base_offset: content_offset,
            pos: 0,
        })
    }

    /// Read any constructed TLV with the given tag, returning a decoder
    /// scoped to its contents. Used for PDU bodies (GET/RESPONSE/etc, all
    /// of which share the SEQUENCE-like layout under a context tag).
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let (content, content_offset) = self.read_tlv_at(expected_tag)?;
        Ok(Decoder {
            data: content,
            base_offset: content_offset,
            pos: 0,
        })
    }

    /// Read an INTEGER.
    pub fn read_integer(&mut self) -> Result<i32> {
        let content = self.read_tlv(tag::universal::INTEGER)?;
        decode_signed(&content).map_err(|k| self.err(k))
    }

    /// Read an INTEGER tagged as a given application/context tag (used for
    /// error_status-like fields that reuse the universal INTEGER tag, kept
    /// here for symmetry with `read_unsigned32`).
    pub fn read_tagged_integer(&mut self, expected_tag: u8) -> Result<i64> {
        let content = self.read_tlv(expected_tag)?;
        if content.len() > 8 {
            return Err(self.err(DecodeErrorKind::Integer64TooLong {
                length: content.len(),
            }));
        }
        Ok(decode_signed_wide(&content))
    }

    /// Read an unsigned 32-bit value with the given application tag
    /// (Counter32, Gauge32/Unsigned32, TimeTicks all share this shape).
    pub fn read_unsigned32(&mut self, expected_tag: u8) -> Result<u32> {
        let content = self.read_tlv(expected_tag)?;
        if content.is_empty() {
            return Err(self.err(DecodeErrorKind::ZeroLengthInteger));
        }
        if content.len() > 5 {
            return Err(self.err(DecodeErrorKind::IntegerOverflow));
        }
        let mut value: u64 = 0;
        for &b in content.iter() {
            value = (value << 8) | b as u64;
        }
        if value > u32::MAX as u64 {
            return Err(self.err(DecodeErrorKind::IntegerOverflow));
        }
        Ok(value as u32)
    }

    /// Read a Counter64.
    pub fn read_counter64(&mut self) -> Result<u64> {
        let content = self.read_tlv(tag::application::COUNTER64)?;
        if content.is_empty() {
            return Err(self.err(DecodeErrorKind::ZeroLengthInteger));
        }
        if content.len() > 9 {
            return Err(self.err(DecodeErrorKind::Integer64TooLong {
                length: content.len(),
            }));
        }
        let mut value: u64 = 0;
        for &b in content.iter() {
            value = (value << 8) | b as u64;
        }
        Ok(value)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        if self.peek_tag()? == tag::universal::OCTET_STRING_CONSTRUCTED {
            return Err(self.err(DecodeErrorKind::ConstructedOctetString));
        }
        self.read_tlv(tag::universal::OCTET_STRING)
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let content = self.read_tlv(tag::universal::NULL)?;
        if !content.is_empty() {
            return Err(self.err(DecodeErrorKind::InvalidNull));
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let content = self.read_tlv(tag::universal::OBJECT_IDENTIFIER)?;
        Oid::from_ber(&content).map_err(|_| self.err(DecodeErrorKind::InvalidOidEncoding))
    }

    /// Read an IpAddress (4-byte OCTET STRING under the application tag).
    pub fn read_ip_address(&mut self) -> Result<[u8; 4]> {
        let content = self.read_tlv(tag::application::IP_ADDRESS)?;
        if content.len() != 4 {
            return Err(self.err(DecodeErrorKind::InvalidIpAddressLength {
                length: content.len(),
            }));
        }
        let mut out = [0u8; 4];
        out.copy_from_slice(&content);
        Ok(out)
    }

    /// Read raw content bytes for an arbitrary/unknown tag, consuming the
    /// whole TLV. Used to preserve unrecognized types round-trip-safely.
    pub fn read_unknown(&mut self) -> Result<(u8, Bytes)> {
        let t = self.peek_tag()?;
        self.pos += 1;
        let (len, consumed) = decode_length(&self.data[self.pos..], self.offset())?;
        self.pos += consumed;
        if self.pos + len > self.data.len() {
            return Err(self.err(DecodeErrorKind::InsufficientData {
                needed: len,
                available: self.data.len() - self.pos,
            }));
        }
        let content = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok((t, content))
    }
}

fn decode_signed(data: &[u8]) -> std::result::Result<i32, DecodeErrorKind> {
    if data.is_empty() {
        return Err(DecodeErrorKind::ZeroLengthInteger);
    }
    if data.len() > 4 {
        return Err(DecodeErrorKind::IntegerOverflow);
    }
    let negative = data[0] & 0x80 != 0;
    let mut value: i64 = if negative { -1 } else { 0 };
    for &b in data {
        value = (value << 8) | b as i64;
    }
    if value < i32::MIN as i64 || value > i32::MAX as i64 {
        return Err(DecodeErrorKind::IntegerOverflow);
    }
    Ok(value as i32)
}

fn decode_signed_wide(data: &[u8]) -> i64 {
    let negative = data.first().map(|b| b & 0x80 != 0).unwrap_or(false);
    let mut value: i64 = if negative { -1 } else { 0 };
    for &b in data {
        value = (value << 8) | b as i64;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::encode::EncodeBuf;

    #[test]
    fn decode_integer_roundtrip() {
        for v in [0i32, 1, -1, 127, 128, -128, -129, i32::MAX, i32::MIN] {
            let mut buf = EncodeBuf::new();
            buf.push_integer(v);
            let bytes = buf.finish();
            let mut dec = Decoder::new(bytes);
            assert_eq!(dec.read_integer().unwrap(), v);
        }
    }

    #[test]
    fn decode_sequence_scoped() {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|b| {
            b.push_integer(2);
            b.push_integer(1);
        });
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        let mut seq = dec.read_sequence().unwrap();
        assert_eq!(seq.read_integer().unwrap(), 1);
        assert_eq!(seq.read_integer().unwrap(), 2);
        assert!(seq.is_empty());
        assert!(dec.is_empty());
    }

    #[test]
    fn decode_octet_string() {
        let mut buf = EncodeBuf::new();
        buf.push_octet_string(b"public");
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        assert_eq!(&dec.read_octet_string().unwrap()[..], b"public");
    }

    #[test]
    fn decode_oid_roundtrip() {
        let oid = crate::oid!(1, 3, 6, 1, 4, 1, 8072, 1, 3);
        let mut buf = EncodeBuf::new();
        buf.push_oid(&oid);
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        assert_eq!(dec.read_oid().unwrap(), oid);
    }

    #[test]
    fn rejects_wrong_tag() {
        let mut buf = EncodeBuf::new();
        buf.push_integer(1);
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        assert!(dec.read_octet_string().is_err());
    }

    #[test]
    fn rejects_truncated() {
        let mut dec = Decoder::new(Bytes::from_static(&[0x02]));
        assert!(dec.read_integer().is_err());
    }

    #[test]
    fn unsigned32_roundtrip() {
        let mut buf = EncodeBuf::new();
        buf.push_unsigned32(tag::application::COUNTER32, 0xFFFF_FFFE);
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        assert_eq!(
            dec.read_unsigned32(tag::application::COUNTER32).unwrap(),
            0xFFFF_FFFE
        );
    }

    #[test]
    fn counter64_roundtrip() {
        let mut buf = EncodeBuf::new();
        buf.push_integer64(u64::MAX);
        let bytes = buf.finish();
        let mut dec = Decoder::new(bytes);
        assert_eq!(dec.read_counter64().unwrap(), u64::MAX);
    }
}
