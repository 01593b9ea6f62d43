//! End-to-end scenarios S1, S2, S3, S6, S7 (spec §8). S4 and S5 (v3
//! discovery and time-window rejection) are covered in `v3_usm.rs` instead,
//! since they share all of that file's v3 message-construction helpers.
//!
//! S1-S3 and S6 drive `VirtualAgent::handle_packet` directly (same pattern
//! as the inline tests in `agent::tests`); S7 spins up a real `Fleet` and
//! uses `recorder::walk` against a live socket, since it needs to observe
//! actual wire round trips through two independent agents.

use bytes::Bytes;
use snmp_fleet::agent::{AgentConfig, HandleOutcome, VirtualAgent};
use snmp_fleet::dataset::{Dataset, DatasetStore};
use snmp_fleet::fleet::{Fleet, FleetOptions};
use snmp_fleet::message::CommunityMessage;
use snmp_fleet::oid;
use snmp_fleet::pdu::{Pdu, PduType};
use snmp_fleet::recorder::{self, WalkOptions};
use snmp_fleet::recording;
use snmp_fleet::router::Router;
use snmp_fleet::store::MibStore;
use snmp_fleet::value::Value;
use snmp_fleet::variation::VariationBinder;
use snmp_fleet::version::Version;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

fn test_agent(store: MibStore, port: u16) -> VirtualAgent {
    let config = AgentConfig {
        device_id: format!("dev-{port}"),
        port,
        sys_name: "dev".into(),
        sys_location: "lab".into(),
        community: "public".into(),
        engine_id: Bytes::from_static(b"\x80\x00\x1f\x88\x80e2e-test"),
        users: vec![],
        router: Arc::new(Router::new(Vec::new())),
        datasets: Arc::new(DatasetStore::new(Dataset::new(store))),
        variation: VariationBinder::empty(),
        trap_hook: None,
        set_trap_oids: None,
    };
    VirtualAgent::new(config, 1)
}

fn peer() -> SocketAddr {
    "127.0.0.1:12345".parse().unwrap()
}

async fn roundtrip(agent: &VirtualAgent, pdu: Pdu) -> CommunityMessage {
    let msg = CommunityMessage::new(Version::V2c, "public", pdu);
    match agent.handle_packet(&msg.encode(), peer()).await {
        HandleOutcome::Reply(bytes) => CommunityMessage::decode(bytes).unwrap(),
        HandleOutcome::Drop => panic!("expected a reply"),
    }
}

/// S1: GET of a canonical scalar returns its exact type and value with
/// error-status 0.
#[tokio::test]
async fn s1_get_canonical_scalar() {
    let mut store = MibStore::new();
    store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("Device-0"));
    let agent = test_agent(store, 16500);

    let pdu = Pdu::request(PduType::GetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)]);
    let response = roundtrip(&agent, pdu).await;

    assert_eq!(response.pdu.error_status, 0);
    assert_eq!(response.pdu.varbinds.len(), 1);
    assert_eq!(response.pdu.varbinds[0].value, Value::from("Device-0"));
}

/// S2: GET-NEXT walks across a gap to the next OID in the store, and
/// GET-NEXT of the final OID returns endOfMibView.
#[tokio::test]
async fn s2_get_next_across_table_boundary() {
    let mut store = MibStore::new();
    store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 9, 0), Value::from("first"));
    store.insert(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(1));
    let agent = test_agent(store, 16501);

    let pdu = Pdu::request(PduType::GetNextRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 9, 0)]);
    let response = roundtrip(&agent, pdu).await;
    assert_eq!(response.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
    assert_eq!(response.pdu.varbinds[0].value, Value::Integer(1));

    let pdu = Pdu::request(PduType::GetNextRequest, 2, &[oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)]);
    let response = roundtrip(&agent, pdu).await;
    assert_eq!(response.pdu.varbinds[0].value, Value::EndOfMibView);
}

/// S3: GET-BULK with non-repeaters=0 and max-repetitions=5 over ten stored
/// scalars returns exactly five varbinds.
#[tokio::test]
async fn s3_get_bulk_max_repetitions() {
    let mut store = MibStore::new();
    for i in 1..=10u32 {
        store.insert(oid!(1, 3, 6, 1, 2, 1, 1, i), Value::Integer(i as i32));
    }
    let agent = test_agent(store, 16502);

    let pdu = Pdu::get_bulk(1, 0, 5, &[oid!(1, 3, 6, 1, 2, 1, 1, 0)]);
    let response = roundtrip(&agent, pdu).await;
    assert_eq!(response.pdu.varbinds.len(), 5);
    for (i, vb) in response.pdu.varbinds.iter().enumerate() {
        assert_eq!(vb.oid, oid!(1, 3, 6, 1, 2, 1, 1, (i as u32) + 1));
    }
}

/// S6: SET is always rejected with notWritable, and the underlying value is
/// left untouched.
#[tokio::test]
async fn s6_set_rejected_value_unchanged() {
    let mut store = MibStore::new();
    store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("original"));
    let agent = test_agent(store, 16503);

    let mut pdu = Pdu::request(PduType::SetRequest, 1, &[oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)]);
    pdu.varbinds[0].value = Value::from("changed");
    let response = roundtrip(&agent, pdu).await;
    assert_eq!(response.pdu.error_status, snmp_fleet::error::ErrorStatus::NotWritable.as_i32());

    let pdu = Pdu::request(PduType::GetRequest, 2, &[oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)]);
    let response = roundtrip(&agent, pdu).await;
    assert_eq!(response.pdu.varbinds[0].value, Value::from("original"));
}

fn write_temp_snmprec(lines: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(lines.as_bytes()).unwrap();
    file
}

fn fleet_options(dataset: &tempfile::NamedTempFile, boots: &tempfile::NamedTempFile, port: u16) -> FleetOptions {
    FleetOptions {
        listen_addr: "127.0.0.1".parse().unwrap(),
        port_start: port,
        port_end: port,
        num_devices: 1,
        dataset_path: dataset.path().to_path_buf(),
        routes: None,
        variations: None,
        v3_users: Vec::new(),
        trap_destinations: Vec::new(),
        cron_expr: None,
        set_trap_oids: None,
        engine_boots_path: boots.path().to_path_buf(),
        community: "public".into(),
    }
}

/// S7: recording agent A's subtree, spawning agent B from that recording,
/// and recording B's same subtree again must reproduce the original
/// recording exactly.
#[tokio::test]
async fn s7_record_replay_identity() {
    let dataset_a = write_temp_snmprec(
        "1.3.6.1.2.1.1.1.0|4|fleet simulator node A\n\
         1.3.6.1.2.1.1.3.0|67|123456\n\
         1.3.6.1.2.1.1.5.0|4|node-a\n",
    );
    let boots_a = tempfile::NamedTempFile::new().unwrap();
    let mut fleet_a = Fleet::new(fleet_options(&dataset_a, &boots_a, 16510)).await.unwrap();
    fleet_a.start().await.unwrap();

    let walk_options = WalkOptions {
        base_oid: oid!(1, 3, 6, 1, 2, 1, 1),
        ..Default::default()
    };
    let addr_a: SocketAddr = "127.0.0.1:16510".parse().unwrap();
    let records_a = recorder::walk(addr_a, &walk_options).await.unwrap();
    assert_eq!(records_a.len(), 3);

    let file_1 = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file_1.path(), recording::serialize(&records_a)).unwrap();

    fleet_a.stop().await;

    // Spawn agent B loading exactly what was recorded to F1.
    let boots_b = tempfile::NamedTempFile::new().unwrap();
    let mut fleet_b = Fleet::new(fleet_options(&file_1, &boots_b, 16511)).await.unwrap();
    fleet_b.start().await.unwrap();

    let addr_b: SocketAddr = "127.0.0.1:16511".parse().unwrap();
    let records_b = recorder::walk(addr_b, &walk_options).await.unwrap();
    fleet_b.stop().await;

    let file_2 = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file_2.path(), recording::serialize(&records_b)).unwrap();

    let text_1 = std::fs::read_to_string(file_1.path()).unwrap();
    let text_2 = std::fs::read_to_string(file_2.path()).unwrap();
    assert_eq!(text_1, text_2);
    assert_eq!(records_a, records_b);
}
