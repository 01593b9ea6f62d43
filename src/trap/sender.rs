//! v2c/v3 trap and inform delivery over a fresh per-send UDP socket.
//!
//! Grounded on the agent's own `encode_v3_response`/`report` message
//! assembly (`agent/mod.rs`): the same zeroed-MAC-then-splice signing
//! dance, just run from the sending side instead of the answering side.

use crate::error::{Error, Result};
use crate::message::{CommunityMessage, ScopedPdu, SecurityLevel};
use crate::pdu::{Pdu, PduType};
use crate::util::bind_ephemeral_udp_socket;
use crate::v3::{self, EngineState, UsmCredentials, UsmSecurityParams};
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

static REQUEST_ID: AtomicI32 = AtomicI32::new(1);

fn next_request_id() -> i32 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// How a destination authenticates an outbound notification.
#[derive(Debug, Clone)]
pub enum TrapSecurity {
    Community { version: Version, community: Bytes },
    V3 { user: UsmCredentials },
}

/// One configured trap/inform receiver.
#[derive(Debug, Clone)]
pub struct TrapDestination {
    pub addr: SocketAddr,
    /// `true` sends TRAPv2 semantics (unacknowledged, best-effort).
    /// `false` sends INFORM and waits for the manager's acknowledgement.
    pub is_inform: bool,
    pub security: TrapSecurity,
}

/// Send one notification to `dest`, waiting for an acknowledgement first
/// if it is configured as an INFORM. `engine` supplies this fleet's v3
/// identity (engineID/boots/time) when `dest` uses USM security.
pub async fn send(
    dest: &TrapDestination,
    engine: &EngineState,
    varbinds: Vec<VarBind>,
    timeout: Duration,
) -> Result<()> {
    let request_id = next_request_id();
    let pdu_type = if dest.is_inform {
        PduType::InformRequest
    } else {
        PduType::TrapV2
    };
    let pdu = Pdu::notification(pdu_type, request_id, varbinds);

    let message = match &dest.security {
        TrapSecurity::Community { version, community } => {
            CommunityMessage::new(*version, community.clone(), pdu).encode()
        }
        TrapSecurity::V3 { user } => encode_v3_notification(engine, user, request_id, pdu)?,
    };

    let socket = bind_ephemeral_udp_socket(dest.addr)
        .await
        .map_err(|e| Error::Io { target: Some(dest.addr), source: e })?;
    socket
        .connect(dest.addr)
        .await
        .map_err(|e| Error::Io { target: Some(dest.addr), source: e })?;

    tokio::time::timeout(timeout, socket.send(&message))
        .await
        .map_err(|_| Error::Timeout { target: Some(dest.addr), elapsed: timeout, request_id, retries: 0 })?
        .map_err(|e| Error::Io { target: Some(dest.addr), source: e })?;

    if dest.is_inform {
        let mut buf = [0u8; 4096];
        tokio::time::timeout(timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout { target: Some(dest.addr), elapsed: timeout, request_id, retries: 0 })?
            .map_err(|e| Error::Io { target: Some(dest.addr), source: e })?;
    }

    Ok(())
}

fn encode_v3_notification(
    engine: &EngineState,
    user: &UsmCredentials,
    request_id: i32,
    pdu: Pdu,
) -> Result<Bytes> {
    let scoped = ScopedPdu {
        context_engine_id: engine.engine_id().clone(),
        context_name: Bytes::new(),
        pdu,
    };
    let mut buf = crate::ber::EncodeBuf::new();
    scoped.encode(&mut buf);
    let plain_scoped = buf.finish();

    let level = match (user.auth_protocol, user.priv_protocol) {
        (Some(_), Some(_)) => SecurityLevel::AuthPriv,
        (Some(_), None) => SecurityLevel::AuthNoPriv,
        _ => SecurityLevel::NoAuthNoPriv,
    };

    let (scoped_pdu_data, priv_params) = if level.requires_priv() {
        let (priv_protocol, priv_key) = v3::require_priv_key(user)?;
        let salt_counter = (engine.engine_time() as u32).wrapping_add(1);
        let (ciphertext, salt) = v3::encrypt_scoped_pdu(
            priv_protocol,
            priv_key,
            engine.engine_boots(),
            engine.engine_time() as u32,
            salt_counter,
            &plain_scoped,
        )
        .map_err(|e| e.into_encrypt_error(None))?;
        (ciphertext, Bytes::copy_from_slice(&salt))
    } else {
        (plain_scoped.to_vec(), Bytes::new())
    };

    let mac_len = user.auth_protocol.map(|p| p.mac_len()).unwrap_or(0);
    let mut security_params = UsmSecurityParams::new(
        engine.engine_id().clone(),
        engine.engine_boots() as i32,
        engine.engine_time(),
        user.user_name.clone(),
    );
    security_params.privacy_parameters = priv_params;
    security_params.authentication_parameters = UsmSecurityParams::zeroed_auth_params(mac_len);
    let security_params_encoded = security_params.encode();

    // Reportable bit clear: notifications don't expect a Report PDU back.
    let mut message = crate::message::encode_v3_message(
        request_id,
        crate::message::MIN_MSG_MAX_SIZE,
        level.flags_bits(),
        3, // USM security model
        &security_params_encoded,
        &scoped_pdu_data,
    )
    .to_vec();

    if level.requires_auth() {
        let (auth_protocol, auth_key) = v3::require_auth_key(user)?;
        if let Some(offset) =
            find_subslice(&message, &UsmSecurityParams::zeroed_auth_params(mac_len))
        {
            v3::sign_message(auth_protocol, auth_key, &mut message, offset)?;
        }
    }

    Ok(Bytes::from(message))
}

/// Locate the zeroed auth-parameters placeholder inside the encoded
/// message so the MAC can be spliced in after the fact (see
/// `agent::find_auth_params_offset`, duplicated here since it's private).
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    fn destination(port: u16) -> TrapDestination {
        TrapDestination {
            addr: format!("127.0.0.1:{port}").parse().unwrap(),
            is_inform: false,
            security: TrapSecurity::Community {
                version: Version::V2c,
                community: Bytes::from_static(b"public"),
            },
        }
    }

    #[tokio::test]
    async fn trap_delivery_reaches_listening_socket() {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = EngineState::new(Bytes::from_static(b"\x80\x00\x1f\x88\x80fleet"), 1);

        let varbinds = vec![VarBind::new(oid!(1, 3, 6, 1, 4, 1, 55555, 0, 1), Value::Integer(1))];
        send(&destination(port), &engine, varbinds, Duration::from_secs(1))
            .await
            .unwrap();

        let mut buf = [0u8; 2048];
        let (n, _) = tokio::time::timeout(Duration::from_secs(1), listener.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let msg = CommunityMessage::decode(Bytes::copy_from_slice(&buf[..n])).unwrap();
        assert_eq!(msg.pdu.pdu_type, PduType::TrapV2);
    }

    #[tokio::test]
    async fn send_times_out_against_unreachable_target() {
        // A closed local port with nothing listening: the send itself
        // succeeds (UDP is fire-and-forget) but an INFORM's ack wait times out.
        let unused = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = unused.local_addr().unwrap().port();
        drop(unused);

        let engine = EngineState::new(Bytes::from_static(b"engine"), 1);
        let mut dest = destination(port);
        dest.is_inform = true;
        let result = send(&dest, &engine, vec![], Duration::from_millis(100)).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }
}
