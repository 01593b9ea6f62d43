//! Named collections of MIB data shared across agents.
//!
//! Grounded on the teacher's handler-level state wrapping (`parking_lot`
//! guarded shared maps passed into request handlers). A [`Dataset`] bundles
//! a [`MibStore`] with its derived [`TableIndex`]; a [`DatasetStore`] holds
//! every dataset loaded at startup, keyed by name, plus the unnamed default
//! dataset every agent falls back to when routing selects none explicitly.

use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::store::{MibStore, TableIndex};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One loaded `.snmprec` dataset: the raw store plus its derived table view.
pub struct Dataset {
    inner: RwLock<DatasetInner>,
}

struct DatasetInner {
    store: MibStore,
    table_index: TableIndex,
}

impl Dataset {
    pub fn new(store: MibStore) -> Arc<Self> {
        let mut store = store;
        let table_index = store.build_table_index();
        Arc::new(Self {
            inner: RwLock::new(DatasetInner { store, table_index }),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(MibStore::new())
    }

    pub fn get(&self, oid: &Oid) -> Option<Value> {
        self.inner.write().store.get(oid).cloned()
    }

    pub fn get_next(&self, oid: &Oid) -> Option<(Oid, Value)> {
        self.inner
            .write()
            .store
            .get_next(oid)
            .map(|(o, v)| (o.clone(), v.clone()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().store.is_empty()
    }

    /// Replace the entire store contents and rebuild the table index.
    pub fn reload(&self, mut store: MibStore) {
        let table_index = store.build_table_index();
        let mut inner = self.inner.write();
        inner.store = store;
        inner.table_index = table_index;
    }

    pub fn with_table_index<R>(&self, f: impl FnOnce(&TableIndex) -> R) -> R {
        f(&self.inner.read().table_index)
    }
}

/// All datasets available to a fleet, keyed by name, with a distinguished
/// default used when no routing rule names one explicitly.
pub struct DatasetStore {
    default: Arc<Dataset>,
    named: HashMap<String, Arc<Dataset>>,
}

impl DatasetStore {
    pub fn new(default: Arc<Dataset>) -> Self {
        Self {
            default,
            named: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, dataset: Arc<Dataset>) {
        self.named.insert(name.into(), dataset);
    }

    pub fn default(&self) -> Arc<Dataset> {
        Arc::clone(&self.default)
    }

    /// Resolve a dataset by name, falling back to the default if `name` is
    /// `None`. Returns an error if `name` is `Some` but unknown.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<Dataset>> {
        match name {
            None => Ok(self.default()),
            Some(name) => self
                .named
                .get(name)
                .cloned()
                .ok_or_else(|| Error::dataset_missing(name)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn resolve_falls_back_to_default() {
        let store = DatasetStore::new(Dataset::empty());
        let resolved = store.resolve(None).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn resolve_unknown_name_errors() {
        let store = DatasetStore::new(Dataset::empty());
        assert!(store.resolve(Some("nope")).is_err());
    }

    #[test]
    fn resolve_named_dataset() {
        let mut mib = MibStore::new();
        mib.insert(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("hi"));
        let mut store = DatasetStore::new(Dataset::empty());
        store.insert("routerA", Dataset::new(mib));
        let resolved = store.resolve(Some("routerA")).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn reload_rebuilds_table_index() {
        let dataset = Dataset::empty();
        assert!(dataset.with_table_index(|t| t.is_empty()));
        let mut mib = MibStore::new();
        mib.insert(oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 1, 1), Value::Integer(1));
        dataset.reload(mib);
        assert!(!dataset.with_table_index(|t| t.is_empty()));
    }
}
