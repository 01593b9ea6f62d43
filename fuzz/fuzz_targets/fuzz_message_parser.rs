#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_fleet::message::{peek_version, decode_v3_header, CommunityMessage};
use snmp_fleet::pdu::Pdu;

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    // Fuzz version sniffing, the first thing a real packet hits.
    let _ = peek_version(&bytes);

    // Fuzz v1/v2c community message decoder directly
    let _ = CommunityMessage::decode(bytes.clone());

    // Fuzz v3 header + scoped-PDU decoder directly
    let _ = decode_v3_header(bytes.clone());

    // Fuzz PDU decoder
    let mut decoder = snmp_fleet::ber::Decoder::new(bytes.clone());
    let _ = Pdu::decode(&mut decoder);
});
