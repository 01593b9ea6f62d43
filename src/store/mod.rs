//! The authoritative, ordered OID -> value mapping for one dataset.
//!
//! Grounded on the teacher's `handler::oid_table::OidTable<V>` (a sorted
//! `Vec<(Oid, V)>` searched by binary search); generalized here with a dirty
//! flag so bulk loads from `.snmprec` files sort once instead of on every
//! insert.

pub mod table;

use crate::oid::Oid;
use crate::value::Value;
use std::cmp::Ordering;

pub use table::TableIndex;

/// Ordered OID -> [`Value`] mapping. Not a trait: there is exactly one
/// implementation, so an inherent impl avoids an indirection nothing needs.
#[derive(Debug, Clone, Default)]
pub struct MibStore {
    entries: Vec<(Oid, Value)>,
    sorted: bool,
}

impl MibStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            sorted: true,
        }
    }

    /// Number of distinct OIDs currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add or replace a single entry. Does not re-sort; `Get`/`GetNext`
    /// transparently sort on demand if the store is dirty.
    pub fn insert(&mut self, oid: Oid, value: Value) {
        if let Ok(idx) = self.binary_search_exact(&oid) {
            self.entries[idx].1 = value;
            return;
        }
        self.entries.push((oid, value));
        self.sorted = false;
    }

    /// Add many entries at once, sorting/deduping a single time at the end.
    pub fn bulk_insert(&mut self, items: impl IntoIterator<Item = (Oid, Value)>) {
        self.entries.extend(items);
        self.sorted = false;
        self.sort_and_dedupe();
    }

    /// Point lookup.
    pub fn get(&mut self, oid: &Oid) -> Option<&Value> {
        self.ensure_sorted();
        self.binary_search_exact(oid)
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// The smallest stored OID strictly greater than `oid`, or `None` at or
    /// past the maximum (callers translate `None` into `EndOfMibView`).
    pub fn get_next(&mut self, oid: &Oid) -> Option<(&Oid, &Value)> {
        self.ensure_sorted();
        let idx = match self
            .entries
            .binary_search_by(|(candidate, _)| candidate.cmp(oid))
        {
            Ok(exact) => exact + 1,
            Err(insert_at) => insert_at,
        };
        self.entries.get(idx).map(|(o, v)| (o, v))
    }

    /// In-order iteration in ascending OID order; `f` returning `false` stops
    /// the walk early.
    pub fn walk(&mut self, mut f: impl FnMut(&Oid, &Value) -> bool) {
        self.ensure_sorted();
        for (oid, value) in &self.entries {
            if !f(oid, value) {
                break;
            }
        }
    }

    /// Iterate every entry whose OID starts with `prefix`, in ascending order.
    pub fn walk_subtree(&mut self, prefix: &Oid, mut f: impl FnMut(&Oid, &Value) -> bool) {
        self.ensure_sorted();
        let start = self
            .entries
            .partition_point(|(oid, _)| oid.cmp(prefix) == Ordering::Less);
        for (oid, value) in &self.entries[start..] {
            if !oid.starts_with(prefix) {
                break;
            }
            if !f(oid, value) {
                break;
            }
        }
    }

    /// Stable sort under the numeric OID comparator; adjacent duplicates
    /// collapse, keeping the later insertion (mirrors `insert`'s
    /// replace-on-match semantics for entries added via `bulk_insert`).
    pub fn sort_and_dedupe(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.entries.dedup_by(|b, a| {
            if a.0 == b.0 {
                a.1 = std::mem::replace(&mut b.1, Value::Null);
                true
            } else {
                false
            }
        });
        self.sorted = true;
    }

    fn ensure_sorted(&mut self) {
        if !self.sorted {
            self.sort_and_dedupe();
        }
    }

    fn binary_search_exact(&self, oid: &Oid) -> Result<usize, usize> {
        if !self.sorted {
            return self
                .entries
                .iter()
                .position(|(o, _)| o == oid)
                .ok_or(self.entries.len());
        }
        self.entries.binary_search_by(|(o, _)| o.cmp(oid))
    }

    /// Build the derived table index by scanning the store's current state.
    pub fn build_table_index(&mut self) -> TableIndex {
        self.ensure_sorted();
        TableIndex::build(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn insert_then_get() {
        let mut store = MibStore::new();
        store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("Device-0"));
        assert_eq!(
            store.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)),
            Some(&Value::from("Device-0"))
        );
        assert_eq!(store.get(&oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)), None);
    }

    #[test]
    fn insert_replaces_existing() {
        let mut store = MibStore::new();
        let o = oid!(1, 3, 6, 1, 2, 1, 1, 5, 0);
        store.insert(o.clone(), Value::Integer(1));
        store.insert(o.clone(), Value::Integer(2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&o), Some(&Value::Integer(2)));
    }

    #[test]
    fn get_next_numeric_order() {
        let mut store = MibStore::new();
        store.bulk_insert([
            (oid!(1, 3, 6, 1, 2, 1, 1, 2), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2, 1, 1, 10), Value::Integer(2)),
            (oid!(1, 3, 6, 1, 2, 1, 1, 9), Value::Integer(3)),
        ]);
        let (next, _) = store.get_next(&oid!(1, 3, 6, 1, 2, 1, 1, 2)).unwrap();
        assert_eq!(next, &oid!(1, 3, 6, 1, 2, 1, 1, 9));
        let (next, _) = store.get_next(&oid!(1, 3, 6, 1, 2, 1, 1, 9)).unwrap();
        assert_eq!(next, &oid!(1, 3, 6, 1, 2, 1, 1, 10));
    }

    #[test]
    fn get_next_end_of_mib() {
        let mut store = MibStore::new();
        store.insert(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Integer(1));
        assert!(store.get_next(&oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)).is_none());
        assert!(store.get_next(&oid!(1, 3, 6, 1, 2, 1, 99)).is_none());
    }

    #[test]
    fn get_next_on_empty_store() {
        let mut store = MibStore::new();
        assert!(store.get_next(&oid!(0, 0)).is_none());
    }

    #[test]
    fn walk_visits_in_ascending_order() {
        let mut store = MibStore::new();
        store.bulk_insert([
            (oid!(1, 3, 6, 1, 3), Value::Integer(3)),
            (oid!(1, 3, 6, 1, 1), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2), Value::Integer(2)),
        ]);
        let mut seen = Vec::new();
        store.walk(|oid, _| {
            seen.push(oid.clone());
            true
        });
        assert_eq!(seen, vec![oid!(1, 3, 6, 1, 1), oid!(1, 3, 6, 1, 2), oid!(1, 3, 6, 1, 3)]);
    }

    #[test]
    fn walk_can_stop_early() {
        let mut store = MibStore::new();
        store.bulk_insert([
            (oid!(1, 3, 6, 1, 1), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2), Value::Integer(2)),
            (oid!(1, 3, 6, 1, 3), Value::Integer(3)),
        ]);
        let mut count = 0;
        store.walk(|_, _| {
            count += 1;
            count < 2
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn walk_completeness_exactly_once() {
        let mut store = MibStore::new();
        let oids = vec![
            oid!(1, 3, 6, 1, 1),
            oid!(1, 3, 6, 1, 2),
            oid!(1, 3, 6, 1, 2, 1),
            oid!(1, 3, 6, 1, 10),
        ];
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
        assert_eq!(visited, expected);
    }

    #[test]
    fn sort_and_dedupe_keeps_later_insertion() {
        let mut store = MibStore::new();
        let o = oid!(1, 3, 6, 1, 1);
        store.bulk_insert([(o.clone(), Value::Integer(1)), (o.clone(), Value::Integer(2))]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&o), Some(&Value::Integer(2)));
    }

    #[test]
    fn walk_subtree_filters_prefix() {
        let mut store = MibStore::new();
        store.bulk_insert([
            (oid!(1, 3, 6, 1, 2, 1, 1), Value::Integer(1)),
            (oid!(1, 3, 6, 1, 2, 1, 2), Value::Integer(2)),
            (oid!(1, 3, 6, 1, 2, 2, 1), Value::Integer(3)),
        ]);
        let mut seen = Vec::new();
        store.walk_subtree(&oid!(1, 3, 6, 1, 2, 1), |oid, _| {
            seen.push(oid.clone());
            true
        });
        assert_eq!(seen.len(), 2);
    }
}
