//! Recorder client: walks a live SNMP agent's MIB with GET-NEXT and writes
//! the responses out as `.snmprec` [`crate::recording::Record`]s.
//!
//! Grounded on the teacher's `client::walk::Walk` stream (`NonIncreasingOid`
//! guard, base-OID subtree-exit check, `EndOfMibView` termination), here
//! collapsed from a `Stream` impl driving a generic multiplexed `Client<T>`
//! down to a single async function over the simplified single-target
//! [`crate::transport::Transport`]: the recorder only ever walks one agent
//! at a time and has no need for a `Client`'s concurrent-request-ID
//! bookkeeping.

use crate::error::{Error, Result};
use crate::message::CommunityMessage;
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::recording::Record;
use crate::transport::{Transport, UdpTransport};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use std::net::SocketAddr;
use std::time::Duration;

/// Options controlling a recording walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub version: Version,
    pub community: String,
    /// Root OID to walk; defaults to the whole MIB (`1.3.6`) when absent.
    pub base_oid: Oid,
    pub timeout: Duration,
    /// Max GET-NEXT requests before giving up, guarding against an agent
    /// that never returns `EndOfMibView` or leaves the subtree.
    pub max_iterations: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            community: "public".into(),
            base_oid: Oid::from_slice(&[1, 3, 6]),
            timeout: Duration::from_secs(2),
            max_iterations: 100_000,
        }
    }
}

/// Walk `target` from `options.base_oid` using repeated GET-NEXT requests,
/// returning every varbind visited as a [`Record`] in walk order.
///
/// Mirrors the teacher's `Walk` stream's three termination conditions:
/// `EndOfMibView`, the returned OID leaving the base subtree, and a
/// non-increasing OID (an agent protocol violation that would otherwise
/// loop forever).
pub async fn walk(target: SocketAddr, options: &WalkOptions) -> Result<Vec<Record>> {
    let transport = UdpTransport::connect(target).await?;
    let mut records = Vec::new();
    let mut cursor = options.base_oid.clone();
    let mut last_returned: Option<Oid> = None;
    let mut request_id: i32 = 1;

    for _ in 0..options.max_iterations {
        let pdu = Pdu::request(PduType::GetNextRequest, request_id, &[cursor.clone()]);
        let vb = send_get_next(&transport, options, pdu).await?;
        request_id = request_id.wrapping_add(1);

        if matches!(vb.value, Value::EndOfMibView) {
            break;
        }
        if !vb.oid.starts_with(&options.base_oid) {
            break;
        }
        if let Some(last) = &last_returned {
            if vb.oid <= *last {
                return Err(Error::NonIncreasingOid {
                    previous: last.clone(),
                    current: vb.oid,
                });
            }
        }

        cursor = vb.oid.clone();
        last_returned = Some(vb.oid.clone());
        records.push(Record {
            oid: vb.oid,
            value: vb.value,
            routing: None,
        });
    }

    Ok(records)
}

async fn send_get_next(transport: &UdpTransport, options: &WalkOptions, pdu: Pdu) -> Result<VarBind> {
    let request_id = pdu.request_id;
    let message = CommunityMessage::new(options.version, options.community.as_str(), pdu);
    let encoded = message.encode();
    transport.send(&encoded).await?;
    let (data, _from) = transport.recv(options.timeout).await?;
    let response = CommunityMessage::decode(data)?;
    if response.pdu.request_id != request_id {
        return Err(Error::RequestIdMismatch {
            expected: request_id,
            actual: response.pdu.request_id,
        });
    }
    response
        .pdu
        .varbinds
        .into_iter()
        .next()
        .ok_or_else(|| Error::decode(0, crate::error::DecodeErrorKind::EmptyResponse))
}
