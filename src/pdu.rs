//! SNMP PDU (protocol data unit) types and codec.

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::{self, VarBind};

/// The kind of a PDU, identified by its context-specific BER tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduType {
    GetRequest,
    GetNextRequest,
    Response,
    SetRequest,
    GetBulkRequest,
    InformRequest,
    TrapV2,
    Report,
}

impl PduType {
    /// The BER tag this PDU type is wrapped in.
    pub fn tag(self) -> u8 {
        match self {
            PduType::GetRequest => tag::pdu::GET_REQUEST,
            PduType::GetNextRequest => tag::pdu::GET_NEXT_REQUEST,
            PduType::Response => tag::pdu::RESPONSE,
            PduType::SetRequest => tag::pdu::SET_REQUEST,
            PduType::GetBulkRequest => tag::pdu::GET_BULK_REQUEST,
            PduType::InformRequest => tag::pdu::INFORM_REQUEST,
            PduType::TrapV2 => tag::pdu::TRAP_V2,
            PduType::Report => tag::pdu::REPORT,
        }
    }

    /// Resolve a PDU type from its wire tag.
    pub fn from_tag(t: u8) -> Option<Self> {
        Some(match t {
            tag::pdu::GET_REQUEST => PduType::GetRequest,
            tag::pdu::GET_NEXT_REQUEST => PduType::GetNextRequest,
            tag::pdu::RESPONSE => PduType::Response,
            tag::pdu::SET_REQUEST => PduType::SetRequest,
            tag::pdu::GET_BULK_REQUEST => PduType::GetBulkRequest,
            tag::pdu::INFORM_REQUEST => PduType::InformRequest,
            tag::pdu::TRAP_V2 => PduType::TrapV2,
            tag::pdu::REPORT => PduType::Report,
            _ => return None,
        })
    }
}

/// A request/response-shaped PDU: `{ request-id, field2, field3, varbind-list }`.
///
/// `field2`/`field3` are `error-status`/`error-index` for every PDU type
/// except GETBULK, where the same wire positions carry
/// `non-repeaters`/`max-repetitions` (RFC 3416 §4.2.3). Accessor methods
/// below give each interpretation a name; the raw fields stay public for
/// callers building GETBULK requests directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    pub error_status: i32,
    pub error_index: i32,
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    /// Build a GET/GETNEXT/SET-style request.
    pub fn request(pdu_type: PduType, request_id: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// Build a GETBULK request.
    pub fn get_bulk(request_id: i32, non_repeaters: i32, max_repetitions: i32, oids: &[Oid]) -> Self {
        Self {
            pdu_type: PduType::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// Build a success RESPONSE.
    pub fn response(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Build an error RESPONSE (error_index is 1-based per RFC 3416).
    pub fn error_response(
        request_id: i32,
        error_status: i32,
        error_index: i32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status,
            error_index,
            varbinds,
        }
    }

    /// Build a TRAPv2/INFORM PDU. `request_id` is arbitrary for traps
    /// (RFC 3416 doesn't require correlation) but must match for INFORMs
    /// that expect an acknowledging RESPONSE.
    pub fn notification(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        debug_assert!(matches!(pdu_type, PduType::TrapV2 | PduType::InformRequest));
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Non-repeaters (only meaningful for `GetBulkRequest`).
    pub fn non_repeaters(&self) -> i32 {
        self.error_status
    }

    /// Max-repetitions (only meaningful for `GetBulkRequest`).
    pub fn max_repetitions(&self) -> i32 {
        self.error_index
    }

    /// Encode this PDU's content (the fields after tag+length).
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            varbind::encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode a PDU, including its tag/length header.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let t = decoder.peek_tag()?;
        let pdu_type = PduType::from_tag(t)
            .ok_or_else(|| Error::decode(decoder.offset(), DecodeErrorKind::UnknownPduType(t)))?;

        let mut body = decoder.read_constructed(t)?;
        let request_id = body.read_integer()?;
        let error_status = body.read_integer()?;
        let error_index = body.read_integer()?;
        let varbinds = varbind::decode_varbind_list(&mut body)?;

        Ok(Self {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }
}

/// SNMPv1 Trap-PDU (RFC 1157 §4.1.6), which has a different shape from
/// every other PDU: no request-id/error-status, and carries the source
/// agent address and generic/specific trap codes directly.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapV1Pdu {
    pub enterprise: Oid,
    pub agent_addr: [u8; 4],
    pub generic_trap: i32,
    pub specific_trap: i32,
    pub time_stamp: u32,
    pub varbinds: Vec<VarBind>,
}

impl TrapV1Pdu {
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
            varbind::encode_varbind_list(buf, &self.varbinds);
            buf.push_unsigned32(tag::application::TIMETICKS, self.time_stamp);
            buf.push_integer(self.specific_trap);
            buf.push_integer(self.generic_trap);
            buf.push_ip_address(self.agent_addr);
            buf.push_oid(&self.enterprise);
        });
    }

    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut body = decoder.read_constructed(tag::pdu::TRAP_V1)?;
        let enterprise = body.read_oid()?;
        let agent_addr = body.read_ip_address()?;
        let generic_trap = body.read_integer()?;
        let specific_trap = body.read_integer()?;
        let time_stamp = body.read_unsigned32(tag::application::TIMETICKS)?;
        let varbinds = varbind::decode_varbind_list(&mut body)?;

        Ok(Self {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}

/// RFC 1157 generic trap codes.
pub mod generic_trap {
    pub const COLD_START: i32 = 0;
    pub const WARM_START: i32 = 1;
    pub const LINK_DOWN: i32 = 2;
    pub const LINK_UP: i32 = 3;
    pub const AUTHENTICATION_FAILURE: i32 = 4;
    pub const EGP_NEIGHBOR_LOSS: i32 = 5;
    pub const ENTERPRISE_SPECIFIC: i32 = 6;
}
