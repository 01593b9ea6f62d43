//! Derived table-index view over a [`super::MibStore`].
//!
//! SNMP conformant tables are stored column-major: every column object
//! appears as its own OID subtree, and a row is identified by the numeric
//! index suffix shared across columns (`<entry>.1.<col>.<row>`). Managers
//! expect `GetNext` to walk rows in ascending numeric index order within a
//! column before moving to the next column, which already falls out of the
//! store's numeric OID ordering - this index exists only so recording and
//! introspection code can ask "which rows does this table have" without
//! rescanning the whole store.

use crate::oid::Oid;
use crate::value::Value;
use std::collections::BTreeMap;

/// One conceptual table, keyed by the OID of its `<entry>` node (the arc
/// directly below the table's `.1` sequence object).
#[derive(Debug, Clone, Default)]
pub struct TableEntry {
    /// column number -> row index -> full OID for that cell.
    pub columns: BTreeMap<u32, BTreeMap<Vec<u32>, Oid>>,
}

/// Maps table `<entry>` OIDs to their column/row layout, rebuilt whenever the
/// backing store's data changes.
#[derive(Debug, Clone, Default)]
pub struct TableIndex {
    tables: BTreeMap<Oid, TableEntry>,
}

impl TableIndex {
    /// Scan `entries` (assumed numerically sorted) and classify every OID
    /// matching `<entry>.1.<col>.<row...>` into its table/column/row slot.
    pub fn build(entries: &[(Oid, Value)]) -> Self {
        let mut tables: BTreeMap<Oid, TableEntry> = BTreeMap::new();

        for (oid, _) in entries {
            if let Some((entry_oid, col, row)) = classify_table_cell(oid) {
                tables
                    .entry(entry_oid)
                    .or_default()
                    .columns
                    .entry(col)
                    .or_default()
                    .insert(row, oid.clone());
            }
        }

        Self { tables }
    }

    pub fn tables(&self) -> impl Iterator<Item = (&Oid, &TableEntry)> {
        self.tables.iter()
    }

    pub fn table(&self, entry_oid: &Oid) -> Option<&TableEntry> {
        self.tables.get(entry_oid)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Classify an OID as a table cell if it has the shape
/// `<entry_prefix> . 1 . <column> . <row arcs...>` with at least one row arc.
///
/// Returns `(entry_oid, column, row_arcs)` where `entry_oid` is the prefix up
/// to and including the arc conventionally named `<entry>` (the arc
/// immediately preceding the literal `1` sequence-of-rows arc).
fn classify_table_cell(oid: &Oid) -> Option<(Oid, u32, Vec<u32>)> {
    let arcs = oid.arcs();
    // Need: ... <entry> 1 <col> <row...>  i.e. at least 4 arcs total with
    // the sequence arc fixed at 1, and at least one row arc.
    if arcs.len() < 4 {
        return None;
    }

    // A scalar's instance sub-identifier is always the literal 0; a
    // conceptual row index never is. That is the only signal available to
    // tell the two apart without MIB knowledge.
    if *arcs.last().unwrap() == 0 {
        return None;
    }

    // The sequence arc can coincide with a "1" anywhere in a well-known
    // prefix (1.3.6.1...), so scan for the rightmost (deepest) candidate
    // split rather than the first one found left to right.
    let max_seq_idx = arcs.len() - 3;
    for seq_idx in (0..=max_seq_idx).rev() {
        if arcs[seq_idx] != 1 {
            continue;
        }
        let entry_oid = Oid::from_slice(&arcs[..=seq_idx]);
        let col = arcs[seq_idx + 1];
        let row = arcs[seq_idx + 2..].to_vec();
        return Some((entry_oid, col, row));
    }
    None
}
