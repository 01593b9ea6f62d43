//! One simulated SNMP device: its own UDP identity, MIB dataset, USM
//! credentials, and variation bindings, driven by a single `handle_packet`
//! entry point that implements the full v1/v2c/v3 request dispatch.
//!
//! Grounded on the teacher's top-level `Agent` (the same "one process, one
//! dispatch function, one security layer" shape) generalized from a
//! registered-handler tree to a single dataset-backed store, since a
//! simulated device has one flat MIB view rather than composable handler
//! prefixes.

mod handler;
pub(crate) mod overlay;
pub mod set_handler;

use crate::dataset::{Dataset, DatasetStore};
use crate::message::{CommunityMessage, SecurityLevel, ScopedPdu, V3Header};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType};
use crate::router::{RouteKey, Router};
use crate::value::Value;
use crate::varbind::VarBind;
use crate::variation::VariationBinder;
use crate::version::Version;
use crate::v3::{self, AuthProtocol, EngineState, UsmCredentials, UsmSecurityParams};
use crate::trap::{TrapManagerHandle, event_oid};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub use handler::{GetNextOutcome, GetOutcome, Identity};

/// `usmStats*.0` report OIDs (RFC 3414 §5). Duplicated from
/// [`crate::v3::engine`]'s private `usm_stats` module since only its
/// classifier functions, not the raw arrays, are part of the public surface.
mod report_oids {
    pub const UNSUPPORTED_SEC_LEVELS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 1, 0];
    pub const NOT_IN_TIME_WINDOWS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 2, 0];
    pub const UNKNOWN_USER_NAMES: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 3, 0];
    pub const UNKNOWN_ENGINE_IDS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 4, 0];
    pub const WRONG_DIGESTS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 5, 0];
    pub const DECRYPTION_ERRORS: &[u32] = &[1, 3, 6, 1, 6, 3, 15, 1, 1, 6, 0];
}

/// Static configuration for one virtual agent, set once at fleet startup.
pub struct AgentConfig {
    pub device_id: String,
    pub port: u16,
    pub sys_name: String,
    pub sys_location: String,
    /// Accepted v1/v2c community string (used for both read and write
    /// requests; writes are rejected regardless by [`set_handler`]).
    pub community: String,
    pub engine_id: Bytes,
    pub users: Vec<UsmCredentials>,
    /// Routing rule list (spec §4.2), consulted per request to select a
    /// dataset from `(community, context, engineID, source IP, dest port)`.
    pub router: Arc<Router>,
    /// Every dataset a routing rule can name, plus the default fallback.
    pub datasets: Arc<DatasetStore>,
    pub variation: Arc<VariationBinder>,
    /// Feeds the trap manager's variation-triggered and SET-triggered
    /// sources (spec §4.6). `None` runs the agent with no trap manager
    /// attached at all.
    pub trap_hook: Option<TrapManagerHandle>,
    /// Restricts the SET-triggered trap source to this OID set; `None`
    /// fires for every rejected SET (spec: "optionally filtered to a
    /// configured OID set").
    pub set_trap_oids: Option<Vec<Oid>>,
}

#[derive(Debug, Default)]
struct UsmStats {
    unsupported_sec_levels: AtomicU32,
    not_in_time_windows: AtomicU32,
    unknown_user_names: AtomicU32,
    unknown_engine_ids: AtomicU32,
    wrong_digests: AtomicU32,
    decryption_errors: AtomicU32,
}

/// The running state of one simulated device.
pub struct VirtualAgent {
    config: AgentConfig,
    engine: EngineState,
    uptime_origin: Instant,
    stats: UsmStats,
}

/// Outcome of handling one inbound datagram.
pub enum HandleOutcome {
    /// Send this response.
    Reply(Bytes),
    /// Drop the request silently (malformed, or a `timeout` variation
    /// fired); the caller must still have waited out any associated delay.
    Drop,
}

impl VirtualAgent {
    pub fn new(config: AgentConfig, engine_boots: u32) -> Self {
        let engine = EngineState::new(config.engine_id.clone(), engine_boots);
        Self {
            config,
            engine,
            uptime_origin: Instant::now(),
            stats: UsmStats::default(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.config.device_id
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// The default dataset, used when no routing rule matches a request.
    pub fn dataset(&self) -> Arc<Dataset> {
        self.config.datasets.default()
    }

    /// Resolve the dataset a request should be served from (spec §4.2,
    /// §4.5 step 4): the first routing rule matching `key`, falling back
    /// to the default dataset if none matches or the matched rule's
    /// dataset is somehow unresolvable (it was already validated to exist
    /// at fleet construction).
    fn resolve_dataset(&self, key: &RouteKey<'_>) -> Arc<Dataset> {
        let name = self.config.router.select(key).and_then(|r| r.dataset.as_deref());
        match self.config.datasets.resolve(name) {
            Ok(dataset) => dataset,
            Err(_) => self.config.datasets.default(),
        }
    }

    pub fn variation(&self) -> &Arc<VariationBinder> {
        &self.config.variation
    }

    pub fn uptime_origin(&self) -> Instant {
        self.uptime_origin
    }

    fn identity(&self) -> Identity<'_> {
        Identity {
            sys_name: &self.config.sys_name,
            sys_location: &self.config.sys_location,
            uptime_origin: self.uptime_origin,
        }
    }

    /// Handle one received UDP datagram end to end: decode, authenticate,
    /// dispatch, and re-encode a response. Returns `Drop` for requests that
    /// get no reply (malformed input, or a `timeout` variation).
    ///
    /// Any delay owed by a `timeout` variation has already been applied by
    /// the time this returns `Drop` - see [`Self::resolve_request`].
    pub async fn handle_packet(&self, data: &[u8], peer: SocketAddr) -> HandleOutcome {
        let version = match crate::message::peek_version(data) {
            Ok(v) => v,
            Err(_) => return HandleOutcome::Drop,
        };

        match version {
            Version::V1 | Version::V2c => self.handle_community(data, version, peer).await,
            Version::V3 => self.handle_v3(data, peer).await,
        }
    }

    async fn handle_community(&self, data: &[u8], version: Version, peer: SocketAddr) -> HandleOutcome {
        let Ok(msg) = CommunityMessage::decode(Bytes::copy_from_slice(data)) else {
            return HandleOutcome::Drop;
        };
        if msg.community.as_ref() != self.config.community.as_bytes() {
            return HandleOutcome::Drop;
        }

        let community = String::from_utf8_lossy(&msg.community);
        let key = RouteKey {
            community: Some(community.as_ref()),
            context: None,
            engine_id: None,
            source_ip: Some(peer.ip()),
            dest_port: Some(self.config.port),
        };
        let dataset = self.resolve_dataset(&key);

        let Some(response_pdu) = self.dispatch(version, msg.pdu, &dataset).await else {
            return HandleOutcome::Drop;
        };

        let response = CommunityMessage::new(version, msg.community, response_pdu);
        HandleOutcome::Reply(response.encode())
    }

    async fn handle_v3(&self, data: &[u8], peer: SocketAddr) -> HandleOutcome {
        let Ok((header, _)) = crate::message::decode_v3_header(Bytes::copy_from_slice(data)) else {
            return HandleOutcome::Drop;
        };
        let Ok(level) = SecurityLevel::from_flags_bits(header.msg_flags) else {
            return HandleOutcome::Drop;
        };
        let reportable = header.msg_flags & 0b100 != 0;

        // Discovery: empty engineID probe gets our identity back unauthenticated.
        if header.security_params.authoritative_engine_id.is_empty() {
            return self.discovery_report(&header);
        }
        if header.security_params.authoritative_engine_id.as_ref() != self.engine.engine_id().as_ref() {
            self.stats.unknown_engine_ids.fetch_add(1, Ordering::Relaxed);
            return self.report(&header, report_oids::UNKNOWN_ENGINE_IDS, reportable);
        }

        let Some(user) = self
            .config
            .users
            .iter()
            .find(|u| u.user_name.as_ref() == header.security_params.user_name.as_ref())
        else {
            self.stats.unknown_user_names.fetch_add(1, Ordering::Relaxed);
            return self.report(&header, report_oids::UNKNOWN_USER_NAMES, reportable);
        };

        let supported_level = match (user.auth_protocol, user.priv_protocol) {
            (Some(_), Some(_)) => SecurityLevel::AuthPriv,
            (Some(_), None) => SecurityLevel::AuthNoPriv,
            (None, None) => SecurityLevel::NoAuthNoPriv,
            (None, Some(_)) => SecurityLevel::AuthNoPriv, // unreachable by construction
        };
        if level_rank(level) > level_rank(supported_level) {
            self.stats.unsupported_sec_levels.fetch_add(1, Ordering::Relaxed);
            return self.report(&header, report_oids::UNSUPPORTED_SEC_LEVELS, reportable);
        }

        if level.requires_auth() {
            let Ok((auth_protocol, auth_key)) = v3::require_auth_key(user) else {
                return HandleOutcome::Drop;
            };
            let mut zeroed = data.to_vec();
            let mac_len = auth_protocol.mac_len();
            if let Some(offset) = find_auth_params_offset(data, &header.security_params.authentication_parameters) {
                zeroed[offset..offset + mac_len].fill(0);
            } else {
                // Missing authentication parameters on a user with auth
                // configured is itself a discovery trigger (spec: "OR
                // missing authentication parameters"), not a silent drop.
                return self.report(&header, report_oids::UNKNOWN_ENGINE_IDS, reportable);
            }
            if v3::verify_message(
                auth_protocol,
                auth_key,
                &zeroed,
                &header.security_params.authentication_parameters,
                Some(peer),
            )
            .is_err()
            {
                self.stats.wrong_digests.fetch_add(1, Ordering::Relaxed);
                return self.report(&header, report_oids::WRONG_DIGESTS, reportable);
            }
        }

        if !self
            .engine
            .check_time_window(header.security_params.authoritative_engine_boots, header.security_params.authoritative_engine_time)
        {
            self.stats.not_in_time_windows.fetch_add(1, Ordering::Relaxed);
            return self.report(&header, report_oids::NOT_IN_TIME_WINDOWS, reportable);
        }

        // `header.scoped_pdu_data` was extracted by `read_unknown`, which
        // strips the outer TLV header: for AuthPriv it's the ciphertext
        // content ready to hand to the privacy layer; for No/AuthNoPriv it's
        // already the content of the plaintext ScopedPdu SEQUENCE, so it
        // decodes as a bare field sequence rather than through
        // `ScopedPdu::decode` (which expects to consume that SEQUENCE tag
        // itself). Decryption, by contrast, hands back the full TLV it was
        // given at encode time, so that branch does go through
        // `ScopedPdu::decode` normally.
        let scoped = if level.requires_priv() {
            let Ok((priv_protocol, priv_key)) = v3::require_priv_key(user) else {
                return HandleOutcome::Drop;
            };
            let plain = match v3::decrypt_scoped_pdu(
                priv_protocol,
                priv_key,
                self.engine.engine_boots(),
                self.engine.engine_time() as u32,
                &header.security_params.privacy_parameters,
                &header.scoped_pdu_data,
            ) {
                Ok(plain) => plain,
                Err(_) => {
                    self.stats.decryption_errors.fetch_add(1, Ordering::Relaxed);
                    return self.report(&header, report_oids::DECRYPTION_ERRORS, reportable);
                }
            };
            let mut decoder = crate::ber::Decoder::new(Bytes::from(plain));
            match ScopedPdu::decode(&mut decoder) {
                Ok(s) => s,
                Err(_) => return HandleOutcome::Drop,
            }
        } else {
            match decode_scoped_pdu_content(header.scoped_pdu_data.clone()) {
                Ok(s) => s,
                Err(_) => return HandleOutcome::Drop,
            }
        };

        let context = (!scoped.context_name.is_empty()).then(|| String::from_utf8_lossy(&scoped.context_name));
        let key = RouteKey {
            community: None,
            context: context.as_deref(),
            engine_id: Some(self.engine.engine_id().as_ref()),
            source_ip: Some(peer.ip()),
            dest_port: Some(self.config.port),
        };
        let dataset = self.resolve_dataset(&key);

        let Some(response_pdu) = self.dispatch(Version::V3, scoped.pdu, &dataset).await else {
            return HandleOutcome::Drop;
        };

        let response_scoped = ScopedPdu {
            context_engine_id: self.engine.engine_id().clone(),
            context_name: scoped.context_name,
            pdu: response_pdu,
        };
        HandleOutcome::Reply(self.encode_v3_response(&header, level, user, response_scoped))
    }

    fn discovery_report(&self, header: &V3Header) -> HandleOutcome {
        self.report(header, report_oids::UNKNOWN_ENGINE_IDS, true)
    }

    /// Build an unauthenticated Report PDU carrying `report_oid`, used both
    /// for engine discovery and for every USM failure report (RFC 3414
    /// §3.2's "a Report PDU is generated" steps).
    fn report(&self, header: &V3Header, report_oid: &[u32], reportable: bool) -> HandleOutcome {
        if !reportable {
            return HandleOutcome::Drop;
        }
        let counter = if report_oid == report_oids::UNSUPPORTED_SEC_LEVELS {
            &self.stats.unsupported_sec_levels
        } else if report_oid == report_oids::NOT_IN_TIME_WINDOWS {
            &self.stats.not_in_time_windows
        } else if report_oid == report_oids::UNKNOWN_USER_NAMES {
            &self.stats.unknown_user_names
        } else if report_oid == report_oids::UNKNOWN_ENGINE_IDS {
            &self.stats.unknown_engine_ids
        } else if report_oid == report_oids::WRONG_DIGESTS {
            &self.stats.wrong_digests
        } else {
            &self.stats.decryption_errors
        };
        let value = Value::Counter32(counter.load(Ordering::Relaxed));
        let report_pdu = Pdu {
            pdu_type: PduType::Report,
            request_id: header.msg_id,
            error_status: 0,
            error_index: 0,
            varbinds: vec![VarBind::new(Oid::from_slice(report_oid), value)],
        };

        let scoped = ScopedPdu {
            context_engine_id: self.engine.engine_id().clone(),
            context_name: Bytes::new(),
            pdu: report_pdu,
        };
        let mut buf = crate::ber::EncodeBuf::new();
        scoped.encode(&mut buf);
        let scoped_bytes = buf.finish();

        let security_params = UsmSecurityParams::new(
            self.engine.engine_id().clone(),
            self.engine.engine_boots() as i32,
            self.engine.engine_time(),
            Bytes::new(),
        );
        let bytes = crate::message::encode_v3_message(
            header.msg_id,
            header.msg_max_size,
            0, // unauthenticated, non-reportable
            header.msg_security_model,
            &security_params.encode(),
            &scoped_bytes,
        );
        HandleOutcome::Reply(bytes)
    }

    fn encode_v3_response(
        &self,
        header: &V3Header,
        level: SecurityLevel,
        user: &UsmCredentials,
        scoped: ScopedPdu,
    ) -> Bytes {
        let mut buf = crate::ber::EncodeBuf::new();
        scoped.encode(&mut buf);
        let plain_scoped = buf.finish();

        let (scoped_pdu_data, priv_params) = if level.requires_priv() {
            let (priv_protocol, priv_key) = v3::require_priv_key(user).expect("checked above");
            // Salt counter value is arbitrary per-message; engine_boots/time anchor it.
            let salt_counter = (self.engine.engine_time() as u32).wrapping_add(1);
            let (ciphertext, salt) = v3::encrypt_scoped_pdu(
                priv_protocol,
                priv_key,
                self.engine.engine_boots(),
                self.engine.engine_time() as u32,
                salt_counter,
                &plain_scoped,
            )
            .expect("encryption with validated key never fails");
            (ciphertext, Bytes::copy_from_slice(&salt))
        } else {
            (plain_scoped.to_vec(), Bytes::new())
        };

        let mac_len = user.auth_protocol.map(AuthProtocol::mac_len).unwrap_or(0);
        let mut security_params = UsmSecurityParams::new(
            self.engine.engine_id().clone(),
            self.engine.engine_boots() as i32,
            self.engine.engine_time(),
            user.user_name.clone(),
        );
        security_params.privacy_parameters = priv_params;
        security_params.authentication_parameters = UsmSecurityParams::zeroed_auth_params(mac_len);
        let security_params_encoded = security_params.encode();

        let mut message = crate::message::encode_v3_message(
            header.msg_id,
            header.msg_max_size,
            level.flags_bits(),
            header.msg_security_model,
            &security_params_encoded,
            &scoped_pdu_data,
        )
        .to_vec();

        if level.requires_auth() {
            let (auth_protocol, auth_key) = v3::require_auth_key(user).expect("checked above");
            if let Some(offset) =
                find_auth_params_offset(&message, &UsmSecurityParams::zeroed_auth_params(mac_len))
            {
                v3::sign_message(auth_protocol, auth_key, &mut message, offset)
                    .expect("signing with validated key never fails");
            }
        }

        Bytes::from(message)
    }

    /// Resolve and answer one GET/GETNEXT/GETBULK/SET PDU against this
    /// agent's dataset. Returns `None` if a `timeout` variation fired,
    /// after sleeping out the delay it reported.
    async fn dispatch(&self, version: Version, pdu: Pdu, dataset: &Dataset) -> Option<Pdu> {
        match pdu.pdu_type {
            PduType::GetRequest => self.handle_get(version, pdu, dataset).await,
            PduType::GetNextRequest => self.handle_get_next(version, pdu, dataset).await,
            PduType::GetBulkRequest => self.handle_get_bulk(pdu, dataset).await,
            PduType::SetRequest => {
                self.notify_set_attempt(&pdu.varbinds);
                Some(set_handler::reject(pdu.request_id, pdu.varbinds))
            }
            _ => None,
        }
    }

    /// Enqueue the SET-triggered trap (spec §4.6), filtered to
    /// `config.set_trap_oids` when configured.
    fn notify_set_attempt(&self, varbinds: &[VarBind]) {
        let Some(hook) = &self.config.trap_hook else { return };
        let relevant: Vec<VarBind> = match &self.config.set_trap_oids {
            Some(filter) => varbinds.iter().filter(|vb| filter.contains(&vb.oid)).cloned().collect(),
            None => varbinds.to_vec(),
        };
        if relevant.is_empty() && self.config.set_trap_oids.is_some() {
            return;
        }
        hook.enqueue(event_oid::set_attempt(), relevant);
    }

    /// Enqueue the variation-triggered trap (spec §4.6) when a resolved
    /// value differs from its underlying overlay/dataset value.
    fn notify_variation_change(&self, oid: &Oid, value: &Value) {
        let Some(hook) = &self.config.trap_hook else { return };
        hook.enqueue(event_oid::variation(), vec![VarBind::new(oid.clone(), value.clone())]);
    }

    async fn handle_get(&self, version: Version, pdu: Pdu, dataset: &Dataset) -> Option<Pdu> {
        let identity = self.identity();
        let mut out = Vec::with_capacity(pdu.varbinds.len());
        for vb in &pdu.varbinds {
            match handler::resolve_get(dataset, &self.config.variation, &identity, &vb.oid) {
                GetOutcome::Value(v, changed) => {
                    if changed {
                        self.notify_variation_change(&vb.oid, &v);
                    }
                    out.push(VarBind::new(vb.oid.clone(), v));
                }
                GetOutcome::NoSuchObject => {
                    if version == Version::V1 {
                        return Some(Pdu::error_response(
                            pdu.request_id,
                            crate::error::ErrorStatus::NoSuchName.as_i32(),
                            (out.len() + 1) as i32,
                            pdu.varbinds.clone(),
                        ));
                    }
                    out.push(VarBind::new(vb.oid.clone(), Value::NoSuchObject));
                }
                GetOutcome::Timeout(delay) => {
                    tokio::time::sleep(delay).await;
                    return None;
                }
            }
        }
        Some(Pdu::response(pdu.request_id, out))
    }

    async fn handle_get_next(&self, version: Version, pdu: Pdu, dataset: &Dataset) -> Option<Pdu> {
        let identity = self.identity();
        let mut out = Vec::with_capacity(pdu.varbinds.len());
        for vb in &pdu.varbinds {
            match handler::resolve_get_next(dataset, &self.config.variation, &identity, &vb.oid) {
                GetNextOutcome::Value(oid, v, changed) => {
                    if changed {
                        self.notify_variation_change(&oid, &v);
                    }
                    out.push(VarBind::new(oid, v));
                }
                GetNextOutcome::EndOfMibView => {
                    if version == Version::V1 {
                        return Some(Pdu::error_response(
                            pdu.request_id,
                            crate::error::ErrorStatus::NoSuchName.as_i32(),
                            (out.len() + 1) as i32,
                            pdu.varbinds.clone(),
                        ));
                    }
                    out.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView));
                }
                GetNextOutcome::Timeout(delay) => {
                    tokio::time::sleep(delay).await;
                    return None;
                }
            }
        }
        Some(Pdu::response(pdu.request_id, out))
    }

    async fn handle_get_bulk(&self, pdu: Pdu, dataset: &Dataset) -> Option<Pdu> {
        const MAX_REPETITIONS_CAP: usize = 128;
        let identity = self.identity();
        let non_repeaters = pdu.non_repeaters().max(0) as usize;
        let max_repetitions = (pdu.max_repetitions().max(0) as usize).min(MAX_REPETITIONS_CAP);
        let mut out = Vec::new();

        for vb in pdu.varbinds.iter().take(non_repeaters) {
            match handler::resolve_get_next(dataset, &self.config.variation, &identity, &vb.oid) {
                GetNextOutcome::Value(oid, v, changed) => {
                    if changed {
                        self.notify_variation_change(&oid, &v);
                    }
                    out.push(VarBind::new(oid, v));
                }
                GetNextOutcome::EndOfMibView => out.push(VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
                GetNextOutcome::Timeout(delay) => {
                    tokio::time::sleep(delay).await;
                    return None;
                }
            }
        }

        for vb in pdu.varbinds.iter().skip(non_repeaters) {
            let mut cursor = vb.oid.clone();
            for _ in 0..max_repetitions {
                match handler::resolve_get_next(dataset, &self.config.variation, &identity, &cursor) {
                    GetNextOutcome::Value(oid, v, changed) => {
                        if changed {
                            self.notify_variation_change(&oid, &v);
                        }
                        cursor = oid.clone();
                        out.push(VarBind::new(oid, v));
                    }
                    GetNextOutcome::EndOfMibView => {
                        out.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                        break;
                    }
                    GetNextOutcome::Timeout(delay) => {
                        tokio::time::sleep(delay).await;
                        return None;
                    }
                }
            }
        }

        Some(Pdu::response(pdu.request_id, out))
    }
}

/// Decode a ScopedPdu's fields directly from content bytes that have already
/// had their enclosing SEQUENCE tag/length stripped (as `Decoder::read_unknown`
/// does), bypassing the SEQUENCE header `ScopedPdu::decode` would otherwise
/// expect to consume itself.
fn decode_scoped_pdu_content(content: Bytes) -> crate::error::Result<ScopedPdu> {
    let mut body = crate::ber::Decoder::new(content);
    let context_engine_id = body.read_octet_string()?;
    let context_name = body.read_octet_string()?;
    let pdu = Pdu::decode(&mut body)?;
    Ok(ScopedPdu {
        context_engine_id,
        context_name,
        pdu,
    })
}

fn level_rank(level: SecurityLevel) -> u8 {
    match level {
        SecurityLevel::NoAuthNoPriv => 0,
        SecurityLevel::AuthNoPriv => 1,
        SecurityLevel::AuthPriv => 2,
    }
}

/// Locate `needle` (the placeholder or real auth-params octets) inside
/// `haystack`, used to zero the MAC field before verifying/signing since
/// the MAC covers the whole message with that field zeroed.
fn find_auth_params_offset(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::store::MibStore;

    fn test_agent() -> VirtualAgent {
        let mut store = MibStore::new();
        store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("test device"));
        let config = AgentConfig {
            device_id: "dev0".into(),
            port: 16100,
            sys_name: "dev0".into(),
            sys_location: "lab".into(),
            community: "public".into(),
            engine_id: Bytes::from_static(b"\x80\x00\x1f\x88\x80fleet-test"),
            users: vec![],
            router: Arc::new(Router::new(Vec::new())),
            datasets: Arc::new(DatasetStore::new(Dataset::new(store))),
            variation: VariationBinder::empty(),
            trap_hook: None,
            set_trap_oids: None,
        };
        VirtualAgent::new(config, 1)
    }

    #[tokio::test]
    async fn get_request_roundtrip_v2c() {
        let agent = test_agent();
        let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = CommunityMessage::new(Version::V2c, "public", pdu);
        let encoded = msg.encode();

        let peer: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        match agent.handle_packet(&encoded, peer).await {
            HandleOutcome::Reply(bytes) => {
                let response = CommunityMessage::decode(bytes).unwrap();
                assert_eq!(response.pdu.varbinds[0].value, Value::from("test device"));
            }
            HandleOutcome::Drop => panic!("expected a reply"),
        }
    }

    /// Routing is resolved per request, not baked in at construction (spec
    /// §4.2, §4.5 step 4): the same agent serves different datasets to
    /// different peers when a rule matches on source IP.
    #[tokio::test]
    async fn routing_selects_dataset_per_request_by_source_ip() {
        let mut default_store = MibStore::new();
        default_store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("default device"));
        let mut alt_store = MibStore::new();
        alt_store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("alt device"));

        let mut datasets = DatasetStore::new(Dataset::new(default_store));
        datasets.insert("alt", Dataset::new(alt_store));

        let special_peer: SocketAddr = "10.0.0.5:9999".parse().unwrap();
        let router = Router::new(vec![crate::router::RoutingRule {
            community: None,
            context: None,
            engine_id: None,
            source_ip: Some(special_peer.ip()),
            dest_port: None,
            dataset: Some("alt".into()),
        }]);

        let config = AgentConfig {
            device_id: "dev1".into(),
            port: 16101,
            sys_name: "dev1".into(),
            sys_location: "lab".into(),
            community: "public".into(),
            engine_id: Bytes::from_static(b"\x80\x00\x1f\x88\x80fleet-test2"),
            users: vec![],
            router: Arc::new(router),
            datasets: Arc::new(datasets),
            variation: VariationBinder::empty(),
            trap_hook: None,
            set_trap_oids: None,
        };
        let agent = VirtualAgent::new(config, 1);
        let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);

        let msg = CommunityMessage::new(Version::V2c, "public", pdu.clone());
        match agent.handle_packet(&msg.encode(), special_peer).await {
            HandleOutcome::Reply(bytes) => {
                let response = CommunityMessage::decode(bytes).unwrap();
                assert_eq!(response.pdu.varbinds[0].value, Value::from("alt device"));
            }
            HandleOutcome::Drop => panic!("expected a reply"),
        }

        let other_peer: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        let msg = CommunityMessage::new(Version::V2c, "public", pdu);
        match agent.handle_packet(&msg.encode(), other_peer).await {
            HandleOutcome::Reply(bytes) => {
                let response = CommunityMessage::decode(bytes).unwrap();
                assert_eq!(response.pdu.varbinds[0].value, Value::from("default device"));
            }
            HandleOutcome::Drop => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn wrong_community_is_dropped() {
        let agent = test_agent();
        let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = CommunityMessage::new(Version::V2c, "wrong", pdu);
        let encoded = msg.encode();
        let peer: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        assert!(matches!(agent.handle_packet(&encoded, peer).await, HandleOutcome::Drop));
    }

    #[tokio::test]
    async fn set_request_rejected_not_writable() {
        let agent = test_agent();
        let mut pdu = Pdu::request(PduType::SetRequest, 2, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        pdu.varbinds[0].value = Value::from("new value");
        let msg = CommunityMessage::new(Version::V2c, "public", pdu);
        let encoded = msg.encode();
        let peer: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        match agent.handle_packet(&encoded, peer).await {
            HandleOutcome::Reply(bytes) => {
                let response = CommunityMessage::decode(bytes).unwrap();
                assert_eq!(
                    response.pdu.error_status,
                    crate::error::ErrorStatus::NotWritable.as_i32()
                );
            }
            HandleOutcome::Drop => panic!("expected a reply"),
        }
    }

    #[tokio::test]
    async fn get_next_walks_past_end_with_end_of_mib_view() {
        let agent = test_agent();
        let pdu = Pdu::request(PduType::GetNextRequest, 3, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = CommunityMessage::new(Version::V2c, "public", pdu);
        let encoded = msg.encode();
        let peer: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        match agent.handle_packet(&encoded, peer).await {
            HandleOutcome::Reply(bytes) => {
                let response = CommunityMessage::decode(bytes).unwrap();
                assert_eq!(response.pdu.varbinds[0].value, Value::EndOfMibView);
            }
            HandleOutcome::Drop => panic!("expected a reply"),
        }
    }
}
