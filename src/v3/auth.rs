//! USM authentication: password-to-key derivation, key localization, and
//! HMAC computation (RFC 3414 §§2.6, A.1-A.3; RFC 7860 for SHA-2).

use crate::error::{AuthErrorKind, Error, Result};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use zeroize::ZeroizeOnDrop;

use super::privacy::PrivKey;
use super::{AuthProtocol, KeyExtension, PrivProtocol};

/// A master key (`Ku`): the password-derived digest before engine-ID
/// localization. Zeroized on drop since it's sensitive key material.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey(Vec<u8>);

impl MasterKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterKey(..)")
    }
}

/// A localized key (`Kul`): the master key localized to a specific
/// authoritative engine ID via the RFC 3414 §2.6 algorithm.
#[derive(Clone, ZeroizeOnDrop)]
pub struct LocalizedKey(Vec<u8>);

impl LocalizedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for LocalizedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalizedKey(..)")
    }
}

/// Master and localized auth/priv key material for one user against one
/// authoritative engine.
#[derive(Debug, Clone)]
pub struct MasterKeys {
    pub auth_master: Option<MasterKey>,
    pub auth_localized: Option<LocalizedKey>,
    pub priv_master: Option<MasterKey>,
    pub priv_localized: Option<LocalizedKey>,
}

/// Expand a password to 2^20 octets via cyclic repetition and digest it,
/// per RFC 3414 Appendix A.1/A.2 ("password to key" algorithm).
fn password_to_key_digest(password: &[u8], digest: fn(&[u8]) -> Vec<u8>) -> Vec<u8> {
    const MEGABYTE: usize = 1024 * 1024;
    if password.is_empty() {
        return digest(&[]);
    }

    let mut buf = Vec::with_capacity(64);
    let mut total = 0usize;
    let mut hasher_input = Vec::with_capacity(MEGABYTE);

    while total < MEGABYTE {
        let remaining = MEGABYTE - total;
        let take = remaining.min(password.len());
        buf.clear();
        // Cyclic repetition: fill from wherever we left off in the password.
        let start = total % password.len();
        for i in 0..take {
            buf.push(password[(start + i) % password.len()]);
        }
        hasher_input.extend_from_slice(&buf);
        total += take;
    }

    digest(&hasher_input)
}

fn md5_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Md5::digest(data).to_vec()
}

fn sha1_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Sha1::digest(data).to_vec()
}

fn sha224_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Sha224::digest(data).to_vec()
}

fn sha256_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Sha256::digest(data).to_vec()
}

fn sha384_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Sha384::digest(data).to_vec()
}

fn sha512_digest(data: &[u8]) -> Vec<u8> {
    use digest::Digest;
    Sha512::digest(data).to_vec()
}

fn digest_fn(protocol: AuthProtocol) -> fn(&[u8]) -> Vec<u8> {
    match protocol {
        AuthProtocol::Md5 => md5_digest,
        AuthProtocol::Sha1 => sha1_digest,
        AuthProtocol::Sha224 => sha224_digest,
        AuthProtocol::Sha256 => sha256_digest,
        AuthProtocol::Sha384 => sha384_digest,
        AuthProtocol::Sha512 => sha512_digest,
    }
}

/// Derive the master key (`Ku`) from a password (RFC 3414 Appendix A.2).
pub fn password_to_key(protocol: AuthProtocol, password: &[u8]) -> MasterKey {
    MasterKey(password_to_key_digest(password, digest_fn(protocol)))
}

/// Localize a master key to an authoritative engine ID (RFC 3414 §2.6,
/// Appendix A.2: `Kul = H(Ku || engineID || Ku)`).
pub fn localize_key(protocol: AuthProtocol, master: &MasterKey, engine_id: &[u8]) -> LocalizedKey {
    let mut input = Vec::with_capacity(master.0.len() * 2 + engine_id.len());
    input.extend_from_slice(&master.0);
    input.extend_from_slice(engine_id);
    input.extend_from_slice(&master.0);
    LocalizedKey(digest_fn(protocol)(&input))
}

/// Derive a localized key directly from a password and engine ID.
pub fn password_to_localized_key(
    protocol: AuthProtocol,
    password: &[u8],
    engine_id: &[u8],
) -> LocalizedKey {
    let master = password_to_key(protocol, password);
    localize_key(protocol, &master, engine_id)
}

/// Derive a privacy key directly from a password and engine ID, applying
/// the protocol's key extension algorithm when its localized auth key is
/// shorter than the cipher needs (AES-192/256, 3DES).
///
/// Both the Blumenthal (AES-192/256) and Reeder (3DES) drafts extend the
/// key the same way: re-run the localization hash over the already
/// localized key (in place of the original master key) and append the
/// extra digest, repeating until there is enough material.
pub fn derive_priv_key(
    priv_protocol: PrivProtocol,
    auth_protocol: AuthProtocol,
    password: &[u8],
    engine_id: &[u8],
) -> PrivKey {
    let localized = password_to_localized_key(auth_protocol, password, engine_id);
    let needed = priv_protocol.key_len();
    let mut material = localized.0.clone();

    if priv_protocol.key_extension_for(auth_protocol) != KeyExtension::None {
        let digest = digest_fn(auth_protocol);
        while material.len() < needed {
            let mut input = Vec::with_capacity(material.len() * 2 + engine_id.len());
            input.extend_from_slice(&material);
            input.extend_from_slice(engine_id);
            input.extend_from_slice(&material);
            material.extend_from_slice(&digest(&input));
        }
    }

    material.truncate(needed);
    PrivKey::new(material)
}

macro_rules! hmac_truncated {
    ($mac_ty:ty, $key:expr, $data:expr, $out_len:expr) => {{
        let mut mac = <$mac_ty>::new_from_slice($key)
            .map_err(|_| Error::auth(None, AuthErrorKind::NoAuthKey))?;
        mac.update($data);
        let full = mac.finalize().into_bytes();
        full[..$out_len].to_vec()
    }};
}

/// Compute the truncated HMAC authentication code over `data` (the whole
/// message with `msgAuthenticationParameters` zeroed), per RFC 3414 §6.3.1
/// (HMAC-96) and RFC 7860 (longer truncations for SHA-2).
pub fn compute_mac(protocol: AuthProtocol, key: &LocalizedKey, data: &[u8]) -> Result<Vec<u8>> {
    let out_len = protocol.mac_len();
    let key = key.0.as_slice();
    let mac = match protocol {
        AuthProtocol::Md5 => hmac_truncated!(Hmac<Md5>, key, data, out_len),
        AuthProtocol::Sha1 => hmac_truncated!(Hmac<Sha1>, key, data, out_len),
        AuthProtocol::Sha224 => hmac_truncated!(Hmac<Sha224>, key, data, out_len),
        AuthProtocol::Sha256 => hmac_truncated!(Hmac<Sha256>, key, data, out_len),
        AuthProtocol::Sha384 => hmac_truncated!(Hmac<Sha384>, key, data, out_len),
        AuthProtocol::Sha512 => hmac_truncated!(Hmac<Sha512>, key, data, out_len),
    };
    Ok(mac)
}

/// Verify a received MAC in constant time against the expected value.
pub fn verify_mac(
    protocol: AuthProtocol,
    key: &LocalizedKey,
    data_with_mac_zeroed: &[u8],
    received_mac: &[u8],
) -> Result<()> {
    use subtle::ConstantTimeEq;

    if received_mac.len() != protocol.mac_len() {
        return Err(Error::auth(
            None,
            AuthErrorKind::WrongMacLength {
                expected: protocol.mac_len(),
                actual: received_mac.len(),
            },
        ));
    }

    let expected = compute_mac(protocol, key, data_with_mac_zeroed)?;
    if expected.as_slice().ct_eq(received_mac).into() {
        Ok(())
    } else {
        Err(Error::auth(None, AuthErrorKind::HmacMismatch))
    }
}
