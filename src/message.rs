//! SNMP message envelope: the version-tagged wrapper around a PDU.
//!
//! v1/v2c messages are `SEQUENCE { version, community, pdu }`. v3 messages
//! use the RFC 3412 `SNMPv3Message` shape with a `USM` security header and
//! a scoped PDU that may be encrypted.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::Pdu;
use crate::v3::usm::UsmSecurityParams;
use crate::version::Version;
use bytes::Bytes;

/// SNMPv3 security level (RFC 3411 §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityLevel {
    /// No authentication, no privacy.
    NoAuthNoPriv,
    /// Authentication without privacy.
    AuthNoPriv,
    /// Authentication and privacy.
    AuthPriv,
}

impl SecurityLevel {
    /// The `msgFlags` bits this level sets (RFC 3412 §6.4): bit 0 = auth,
    /// bit 1 = priv. Bit 2 (reportable) is set by the caller separately.
    pub fn flags_bits(self) -> u8 {
        match self {
            SecurityLevel::NoAuthNoPriv => 0b00,
            SecurityLevel::AuthNoPriv => 0b01,
            SecurityLevel::AuthPriv => 0b11,
        }
    }

    pub fn from_flags_bits(bits: u8) -> Result<Self> {
        match bits & 0b11 {
            0b00 => Ok(SecurityLevel::NoAuthNoPriv),
            0b01 => Ok(SecurityLevel::AuthNoPriv),
            0b11 => Ok(SecurityLevel::AuthPriv),
            _ => Err(Error::decode(0, DecodeErrorKind::InvalidMsgFlags)),
        }
    }

    pub fn requires_auth(self) -> bool {
        !matches!(self, SecurityLevel::NoAuthNoPriv)
    }

    pub fn requires_priv(self) -> bool {
        matches!(self, SecurityLevel::AuthPriv)
    }
}

/// A decoded but not-yet-security-processed SNMPv3 message: the
/// `msgGlobalData` plus an opaque `msgSecurityParameters`/scoped-PDU
/// payload that the USM layer (see [`crate::v3::usm`]) still has to
/// authenticate and, if encrypted, decrypt.
#[derive(Debug, Clone)]
pub struct V3Header {
    pub msg_id: i32,
    pub msg_max_size: i32,
    pub msg_flags: u8,
    pub msg_security_model: i32,
    pub security_params: UsmSecurityParams,
    /// Either the plaintext scoped PDU bytes, or ciphertext if privacy is
    /// in use; the caller resolves this via `security_params`/`msg_flags`.
    pub scoped_pdu_data: Bytes,
}

/// A fully-parsed scoped PDU: `{ contextEngineID, contextName, data }`.
#[derive(Debug, Clone)]
pub struct ScopedPdu {
    pub context_engine_id: Bytes,
    pub context_name: Bytes,
    pub pdu: Pdu,
}

impl ScopedPdu {
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.context_name);
            buf.push_octet_string(&self.context_engine_id);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let context_engine_id = seq.read_octet_string()?;
        let context_name = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            context_engine_id,
            context_name,
            pdu,
        })
    }
}

/// A full v1/v2c message: `SEQUENCE { version, community, pdu }`.
#[derive(Debug, Clone)]
pub struct CommunityMessage {
    pub version: Version,
    pub community: Bytes,
    pub pdu: Pdu,
}

impl CommunityMessage {
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });
        buf.finish()
    }

    /// Decode a v1/v2c message. Assumes the caller has already peeked the
    /// version field and confirmed it's not v3 (see [`peek_version`]).
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version_raw = seq.read_integer()?;
        let version = Version::from_i32(version_raw)
            .ok_or_else(|| Error::decode(seq.offset(), DecodeErrorKind::UnknownVersion(version_raw)))?;
        let community = seq.read_octet_string()?;
        let pdu = Pdu::decode(&mut seq)?;
        Ok(Self {
            version,
            community,
            pdu,
        })
    }
}

/// Peek the outer message's `version` field without consuming or fully
/// parsing the rest, so the caller can dispatch to the v1/v2c or v3 path.
pub fn peek_version(data: &[u8]) -> Result<Version> {
    let mut decoder = Decoder::new(Bytes::copy_from_slice(data));
    let mut seq = decoder.read_sequence()?;
    let version_raw = seq.read_integer()?;
    Version::from_i32(version_raw)
        .ok_or_else(|| Error::decode(0, DecodeErrorKind::UnknownVersion(version_raw)))
}

/// Minimum `msgMaxSize` allowed by RFC 3412 §6.3.
pub const MIN_MSG_MAX_SIZE: i32 = 484;

/// Encode the v3 global header + security-parameters + scoped-pdu-data
/// envelope. The security params and scoped PDU bytes are pre-encoded by
/// the USM layer since they require keys this module doesn't hold.
pub fn encode_v3_message(
    msg_id: i32,
    msg_max_size: i32,
    msg_flags: u8,
    msg_security_model: i32,
    security_params_encoded: &[u8],
    scoped_pdu_data: &[u8],
) -> Bytes {
    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        buf.push_bytes_raw(scoped_pdu_data);
        buf.push_octet_string(security_params_encoded);
        buf.push_sequence(|buf| {
            buf.push_integer(msg_security_model);
            buf.push_octet_string(&[msg_flags]);
            buf.push_integer(msg_max_size);
            buf.push_integer(msg_id);
        });
        buf.push_integer(Version::V3.as_i32());
    });
    buf.finish()
}

/// Decode the v3 global header, returning the raw (still-opaque) security
/// parameters bytes and scoped-pdu-data bytes for the USM layer to process.
pub fn decode_v3_header(data: Bytes) -> Result<(V3Header, Bytes)> {
    let mut decoder = Decoder::new(data);
    let mut outer = decoder.read_sequence()?;
    let version_raw = outer.read_integer()?;
    if version_raw != Version::V3.as_i32() {
        return Err(Error::decode(
            outer.offset(),
            DecodeErrorKind::UnknownVersion(version_raw),
        ));
    }

    let mut header_seq = outer.read_sequence()?;
    let msg_id = header_seq.read_integer()?;
    let msg_max_size = header_seq.read_integer()?;
    if msg_max_size < MIN_MSG_MAX_SIZE {
        return Err(Error::decode(
            header_seq.offset(),
            DecodeErrorKind::MsgMaxSizeTooSmall {
                value: msg_max_size,
                minimum: MIN_MSG_MAX_SIZE,
            },
        ));
    }
    let flags_bytes = header_seq.read_octet_string()?;
    let msg_flags = *flags_bytes.first().unwrap_or(&0);
    let msg_security_model = header_seq.read_integer()?;

    let security_params_raw = outer.read_octet_string()?;
    let security_params = UsmSecurityParams::decode(&security_params_raw)?;

    let (_, scoped_pdu_data) = outer.read_unknown()?;

    Ok((
        V3Header {
            msg_id,
            msg_max_size,
            msg_flags,
            msg_security_model,
            security_params,
            scoped_pdu_data: scoped_pdu_data.clone(),
        },
        scoped_pdu_data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::pdu::PduType;

    #[test]
    fn community_message_roundtrip() {
        let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = CommunityMessage::new(Version::V2c, "public", pdu.clone());
        let encoded = msg.encode();
        let decoded = CommunityMessage::decode(encoded).unwrap();
        assert_eq!(decoded.version, Version::V2c);
        assert_eq!(&decoded.community[..], b"public");
        assert_eq!(decoded.pdu, pdu);
    }

    #[test]
    fn peek_version_v1() {
        let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1)]);
        let msg = CommunityMessage::new(Version::V1, "public", pdu);
        let encoded = msg.encode();
        assert_eq!(peek_version(&encoded).unwrap(), Version::V1);
    }

    #[test]
    fn security_level_flags_roundtrip() {
        for level in [
            SecurityLevel::NoAuthNoPriv,
            SecurityLevel::AuthNoPriv,
            SecurityLevel::AuthPriv,
        ] {
            let bits = level.flags_bits();
            assert_eq!(SecurityLevel::from_flags_bits(bits).unwrap(), level);
        }
    }
}
