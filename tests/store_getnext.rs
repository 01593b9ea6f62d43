//! Properties 2 and 3 (spec §8): GET-NEXT totality and walk completeness,
//! exercised across randomized datasets rather than the small fixed cases
//! already covered inline in `store::tests`.

use proptest::prelude::*;
use snmp_fleet::oid::Oid;
use snmp_fleet::store::MibStore;
use snmp_fleet::value::Value;

fn distinct_oids() -> impl Strategy<Value = Vec<Oid>> {
    prop::collection::vec(prop::collection::vec(1u32..50, 3..7), 1..60).prop_map(|mut arcs| {
        arcs.sort();
        arcs.dedup();
        arcs.into_iter().map(Oid::from_vec).collect()
    })
}

proptest! {
    /// For every OID actually in the store, GetNext returns the unique
    /// smallest stored OID strictly greater than it (found here by a naive
    /// linear scan over the sorted input, independent of MibStore's own
    /// binary-search implementation).
    #[test]
    fn get_next_matches_naive_successor(oids in distinct_oids()) {
        let mut sorted = oids.clone();
        sorted.sort();

        let mut store = MibStore::new();
        store.bulk_insert(oids.iter().cloned().map(|o| (o, Value::Integer(0))));

        for (i, oid) in sorted.iter().enumerate() {
            let expected = sorted.get(i + 1);
            let actual = store.get_next(oid).map(|(o, _)| o.clone());
            prop_assert_eq!(actual.as_ref(), expected);
        }
    }

    /// Walking GetNext from the empty OID visits every stored OID exactly
    /// once, in ascending order, with no duplicates and no omissions.
    #[test]
    fn walk_from_empty_visits_everything_exactly_once(oids in distinct_oids()) {
        let mut store = MibStore::new();
        store.bulk_insert(oids.iter().cloned().map(|o| (o, Value::Integer(0))));

        let mut visited = Vec::new();
        let mut cursor = Oid::from_slice(&[0, 0]);
        loop {
            match store.get_next(&cursor) {
                Some((next, _)) => {
                    visited.push(next.clone());
                    cursor = next.clone();
                }
                None => break,
            }
        }

        let mut expected = oids;
        expected.sort();
        prop_assert_eq!(visited, expected);
    }
}

#[test]
fn get_next_past_maximum_is_empty() {
    let mut store = MibStore::new();
    store.insert(snmp_fleet::oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Integer(1));
    assert!(store.get_next(&snmp_fleet::oid!(1, 3, 6, 99)).is_none());
}

#[test]
fn table_index_groups_rows_by_column_after_bulk_load() {
    let mut store = MibStore::new();
    store.bulk_insert([
        (snmp_fleet::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 1), Value::from("eth0")),
        (snmp_fleet::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, 2), Value::from("eth1")),
        (snmp_fleet::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 10, 1), Value::Counter32(100)),
    ]);
    let index = store.build_table_index();
    let entry_oid = snmp_fleet::oid!(1, 3, 6, 1, 2, 1, 2, 2, 1);
    let table = index.table(&entry_oid).expect("ifTable indexed");
    assert_eq!(table.columns.len(), 2);
    assert_eq!(table.columns.get(&2).map(|rows| rows.len()), Some(2));
}
