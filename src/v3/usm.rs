//! User-based Security Model wire format and message processing
//! (RFC 3414 §2.4, RFC 3412 §6).

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{AuthErrorKind, DecodeErrorKind, Error, Result};
use bytes::Bytes;
use std::net::SocketAddr;

use super::auth::{self, LocalizedKey};
use super::privacy::{self, PrivKey, PrivacyResult};
use super::{AuthProtocol, PrivProtocol};

/// The `msgSecurityParameters` SEQUENCE carried (DER-wrapped in an OCTET
/// STRING) inside every SNMPv3 message, per RFC 3414 §2.4:
///
/// ```text
/// UsmSecurityParameters ::= SEQUENCE {
///     msgAuthoritativeEngineID     OCTET STRING,
///     msgAuthoritativeEngineBoots  INTEGER (0..2147483647),
///     msgAuthoritativeEngineTime   INTEGER (0..2147483647),
///     msgUserName                  OCTET STRING,
///     msgAuthenticationParameters  OCTET STRING,
///     msgPrivacyParameters         OCTET STRING
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsmSecurityParams {
    pub authoritative_engine_id: Bytes,
    pub authoritative_engine_boots: i32,
    pub authoritative_engine_time: i32,
    pub user_name: Bytes,
    pub authentication_parameters: Bytes,
    pub privacy_parameters: Bytes,
}

impl UsmSecurityParams {
    /// Build security params with zeroed auth/priv parameter placeholders,
    /// ready for the encoder to fill in after MAC computation.
    pub fn new(
        authoritative_engine_id: impl Into<Bytes>,
        authoritative_engine_boots: i32,
        authoritative_engine_time: i32,
        user_name: impl Into<Bytes>,
    ) -> Self {
        Self {
            authoritative_engine_id: authoritative_engine_id.into(),
            authoritative_engine_boots,
            authoritative_engine_time,
            user_name: user_name.into(),
            authentication_parameters: Bytes::new(),
            privacy_parameters: Bytes::new(),
        }
    }

    /// Placeholder-sized auth parameters (all zero octets), used before a
    /// MAC is computed so the encoded message has the right length.
    pub fn zeroed_auth_params(mac_len: usize) -> Bytes {
        Bytes::from(vec![0u8; mac_len])
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            buf.push_octet_string(&self.privacy_parameters);
            buf.push_octet_string(&self.authentication_parameters);
            buf.push_octet_string(&self.user_name);
            buf.push_integer(self.authoritative_engine_time);
            buf.push_integer(self.authoritative_engine_boots);
            buf.push_octet_string(&self.authoritative_engine_id);
        });
        buf.finish().to_vec()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(Bytes::copy_from_slice(data));
        let mut seq = decoder.read_sequence()?;
        let authoritative_engine_id = seq.read_octet_string()?;
        let authoritative_engine_boots = seq.read_integer()?;
        let authoritative_engine_time = seq.read_integer()?;
        let user_name = seq.read_octet_string()?;
        let authentication_parameters = seq.read_octet_string()?;
        let privacy_parameters = seq.read_octet_string()?;
        if authoritative_engine_boots < 0 || authoritative_engine_time < 0 {
            return Err(Error::decode(seq.offset(), DecodeErrorKind::InvalidLength));
        }
        Ok(Self {
            authoritative_engine_id,
            authoritative_engine_boots,
            authoritative_engine_time,
            user_name,
            authentication_parameters,
            privacy_parameters,
        })
    }
}

/// Derived key material plus protocol choices for one USM user against one
/// authoritative engine, sufficient to authenticate/encrypt outgoing
/// messages and verify/decrypt incoming ones.
#[derive(Debug, Clone)]
pub struct UsmCredentials {
    pub user_name: Bytes,
    pub auth_protocol: Option<AuthProtocol>,
    pub auth_key: Option<LocalizedKey>,
    pub priv_protocol: Option<PrivProtocol>,
    pub priv_key: Option<PrivKey>,
}

impl UsmCredentials {
    pub fn no_auth_no_priv(user_name: impl Into<Bytes>) -> Self {
        Self {
            user_name: user_name.into(),
            auth_protocol: None,
            auth_key: None,
            priv_protocol: None,
            priv_key: None,
        }
    }

    pub fn auth_no_priv(
        user_name: impl Into<Bytes>,
        auth_protocol: AuthProtocol,
        auth_key: LocalizedKey,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            auth_protocol: Some(auth_protocol),
            auth_key: Some(auth_key),
            priv_protocol: None,
            priv_key: None,
        }
    }

    pub fn auth_priv(
        user_name: impl Into<Bytes>,
        auth_protocol: AuthProtocol,
        auth_key: LocalizedKey,
        priv_protocol: PrivProtocol,
        priv_key: PrivKey,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            auth_protocol: Some(auth_protocol),
            auth_key: Some(auth_key),
            priv_protocol: Some(priv_protocol),
            priv_key: Some(priv_key),
        }
    }
}

/// Compute the MAC over a fully-encoded v3 message with
/// `msgAuthenticationParameters` zeroed, then splice the real MAC back in
/// at the position it occupies in the wire bytes.
///
/// `auth_params_offset`/`auth_params_len` locate the placeholder octets
/// inside `message_bytes`, found by the caller while assembling the
/// message (before the MAC exists, the field is zero-filled at its real
/// length so the overall message length never shifts).
pub fn sign_message(
    auth_protocol: AuthProtocol,
    key: &LocalizedKey,
    message_bytes: &mut [u8],
    auth_params_offset: usize,
) -> Result<()> {
    let mac_len = auth_protocol.mac_len();
    let mac = auth::compute_mac(auth_protocol, key, message_bytes)?;
    debug_assert_eq!(mac.len(), mac_len);
    message_bytes[auth_params_offset..auth_params_offset + mac_len].copy_from_slice(&mac);
    Ok(())
}

/// Verify an incoming message's MAC. `message_bytes` must have its
/// `msgAuthenticationParameters` octets zeroed in place before calling (the
/// caller does this against a scratch copy, since the original still needs
/// the real MAC for re-transmission/logging).
pub fn verify_message(
    auth_protocol: AuthProtocol,
    key: &LocalizedKey,
    message_bytes_with_mac_zeroed: &[u8],
    received_mac: &[u8],
    target: Option<SocketAddr>,
) -> Result<()> {
    auth::verify_mac(auth_protocol, key, message_bytes_with_mac_zeroed, received_mac)
        .map_err(|e| match e {
            Error::AuthenticationFailed { kind, .. } => Error::auth(target, kind),
            other => other,
        })
}

/// Encrypt a scoped PDU for AuthPriv transport.
pub fn encrypt_scoped_pdu(
    priv_protocol: PrivProtocol,
    key: &PrivKey,
    engine_boots: u32,
    engine_time: u32,
    salt_counter: u32,
    plaintext: &[u8],
) -> PrivacyResult<(Vec<u8>, [u8; 8])> {
    privacy::encrypt(priv_protocol, key, engine_boots, engine_time, salt_counter, plaintext)
}

/// Decrypt a received scoped PDU for AuthPriv transport.
pub fn decrypt_scoped_pdu(
    priv_protocol: PrivProtocol,
    key: &PrivKey,
    engine_boots: u32,
    engine_time: u32,
    priv_params: &[u8],
    ciphertext: &[u8],
) -> PrivacyResult<Vec<u8>> {
    privacy::decrypt(priv_protocol, key, engine_boots, engine_time, priv_params, ciphertext)
}

/// Map a missing-credentials condition to the right [`AuthErrorKind`].
pub fn require_auth_key(credentials: &UsmCredentials) -> Result<(AuthProtocol, &LocalizedKey)> {
    match (credentials.auth_protocol, credentials.auth_key.as_ref()) {
        (Some(p), Some(k)) => Ok((p, k)),
        _ => Err(Error::auth(None, AuthErrorKind::NoAuthKey)),
    }
}

/// Map a missing-credentials condition to the right error for privacy.
pub fn require_priv_key(credentials: &UsmCredentials) -> Result<(PrivProtocol, &PrivKey)> {
    match (credentials.priv_protocol, credentials.priv_key.as_ref()) {
        (Some(p), Some(k)) => Ok((p, k)),
        _ => Err(Error::auth(None, AuthErrorKind::NoCredentials)),
    }
}
