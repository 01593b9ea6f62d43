//! Durable `engineBoots` storage, so an agent's boot counter survives restart
//! (RFC 3414 §2.3 requires `engineBoots` to never repeat for a given
//! `engineID`).
//!
//! The file is a small JSON document keyed by the engine ID's hex encoding,
//! written atomically (write to a sibling temp file, then rename) so a crash
//! mid-write never corrupts the previous value.

use crate::error::{Error, Result};
use crate::util::encode_hex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEngine {
    engine_id: String,
    boots: u32,
    updated: String,
}

/// On-disk store of `engineID -> engineBoots` records, one process-wide file
/// shared by every virtual agent in a fleet.
#[derive(Debug)]
pub struct EngineBootsStore {
    path: PathBuf,
}

impl EngineBootsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_all(&self) -> Result<HashMap<String, PersistedEngine>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                if contents.trim().is_empty() {
                    return Ok(HashMap::new());
                }
                let records: HashMap<String, PersistedEngine> = serde_json::from_str(&contents)
                    .map_err(|e| Error::config(crate::error::ConfigErrorKind::InvalidYaml {
                        detail: e.to_string(),
                    }))?;
                Ok(records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Error::PersistentStateWrite {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    /// Load the current `engineBoots` for `engine_id`, or `0` if this is the
    /// first time this engine ID has been seen.
    pub fn load_boots(&self, engine_id: &[u8]) -> Result<u32> {
        let records = self.load_all()?;
        Ok(records
            .get(&encode_hex(engine_id))
            .map(|r| r.boots)
            .unwrap_or(0))
    }

    /// Record `boots` for `engine_id`, replacing any prior value, and flush
    /// the whole store to disk atomically.
    pub fn store_boots(&self, engine_id: &[u8], boots: u32) -> Result<()> {
        let mut records = self.load_all()?;
        let hex = encode_hex(engine_id);
        records.insert(
            hex.clone(),
            PersistedEngine {
                engine_id: hex,
                boots,
                updated: timestamp_now(),
            },
        );
        self.write_all(&records)
    }

    /// Load the current boots for `engine_id` and atomically persist
    /// `boots + 1`, returning the incremented value. Called once at agent
    /// startup so `engineBoots` monotonically increases across restarts.
    pub fn bump_boots(&self, engine_id: &[u8]) -> Result<u32> {
        let current = self.load_boots(engine_id)?;
        let next = current.saturating_add(1);
        self.store_boots(engine_id, next)?;
        Ok(next)
    }

    fn write_all(&self, records: &HashMap<String, PersistedEngine>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(records).map_err(|e| {
            Error::PersistentStateWrite {
                path: self.path.display().to_string(),
                source: std::io::Error::other(e),
            }
        })?;

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, serialized).map_err(|e| Error::PersistentStateWrite {
            path: tmp_path.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| Error::PersistentStateWrite {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// An RFC 3339-ish timestamp suitable for a human glancing at the file;
/// not parsed back by this module.
fn timestamp_now() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("unix:{}", secs)
}
