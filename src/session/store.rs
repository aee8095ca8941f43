//! Resumable wallet sessions and their persistence.
//!
//! # Design Decisions
//! - Saves go to a sibling temp file that is then renamed over the target
//! - An unreadable session file is logged and replaced, never fatal

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::chain::{ChainFamily, NetworkId};

/// The connector last connected for one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub connector_id: String,
    pub network: NetworkId,
    /// Seconds since epoch.
    pub saved_at: u64,
}

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    session_id: Uuid,
    entries: BTreeMap<ChainFamily, SessionEntry>,
}

/// Thread-safe map of family -> last connector, optionally persisted as JSON.
///
/// Clones share the same entries.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<ChainFamily, SessionEntry>>,
    persistence_path: Option<PathBuf>,
    session_id: Uuid,
    /// Serializes saves so the last rename carries the newest snapshot.
    write_lock: Arc<Mutex<()>>,
}

impl SessionStore {
    /// Empty store; `record` and `clear` write to `persistence_path` when set.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            session_id: Uuid::new_v4(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load from `path` if it exists, otherwise start empty.
    ///
    /// A file that does not parse is logged and ignored; the next save
    /// overwrites it. Only I/O errors are returned.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let mut store = Self::new(Some(path.to_path_buf()));
        if !path.exists() {
            return Ok(store);
        }

        let bytes = std::fs::read(path)?;
        let file: SessionFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Saved wallet sessions unreadable, starting without them"
                );
                return Ok(store);
            }
        };

        store.session_id = file.session_id;
        for (family, entry) in file.entries {
            store.inner.insert(family, entry);
        }
        tracing::info!(
            path = %path.display(),
            session_id = %store.session_id,
            entries = store.inner.len(),
            "Loaded saved wallet sessions"
        );
        Ok(store)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Write all entries to the persistence path. No-op without one.
    ///
    /// A crash mid-save leaves the previous file intact.
    pub fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let file = SessionFile {
            session_id: self.session_id,
            entries: self
                .inner
                .iter()
                .map(|r| (*r.key(), r.value().clone()))
                .collect(),
        };

        let tmp = temp_path(path);
        let result = write_json(&tmp, &file).and_then(|()| std::fs::rename(&tmp, path));
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result?;

        tracing::debug!(path = %path.display(), entries = file.entries.len(), "Saved wallet sessions");
        Ok(())
    }

    pub fn record(&self, family: ChainFamily, connector_id: &str, network: &NetworkId) {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.inner.insert(
            family,
            SessionEntry {
                connector_id: connector_id.to_string(),
                network: network.clone(),
                saved_at,
            },
        );
        self.persist();
    }

    pub fn clear(&self, family: ChainFamily) {
        if self.inner.remove(&family).is_some() {
            self.persist();
        }
    }

    pub fn get(&self, family: ChainFamily) -> Option<SessionEntry> {
        self.inner.get(&family).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist wallet sessions");
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("sessions"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_json(path: &Path, file: &SessionFile) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, file)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_get_clear() {
        let store = SessionStore::new(None);
        let network = NetworkId::new("signet");
        store.record(ChainFamily::Utxo, "unisat", &network);

        let entry = store.get(ChainFamily::Utxo).unwrap();
        assert_eq!(entry.connector_id, "unisat");
        assert_eq!(entry.network, network);
        assert!(store.get(ChainFamily::Evm).is_none());

        store.clear(ChainFamily::Utxo);
        assert!(store.is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::new(Some(path.clone()));
        store.record(ChainFamily::Cosmos, "keplr", &NetworkId::new("bbn-test-5"));
        store.record(ChainFamily::Evm, "local-key", &NetworkId::new("eip155:11155111"));
        store.clear(ChainFamily::Evm);

        let loaded = SessionStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.session_id(), store.session_id());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(ChainFamily::Cosmos).unwrap().connector_id, "keplr");
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load_from_file(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_malformed_file_starts_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{\"session_id\": \"not-a-uuid\", \"entr").unwrap();

        let store = SessionStore::load_from_file(&path).unwrap();
        assert!(store.is_empty());

        store.record(ChainFamily::Utxo, "unisat", &NetworkId::new("signet"));
        let reloaded = SessionStore::load_from_file(&path).unwrap();
        assert_eq!(reloaded.get(ChainFamily::Utxo).unwrap().connector_id, "unisat");
    }

    #[test]
    fn test_save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::new(Some(path.clone()));

        store.record(ChainFamily::Cosmos, "keplr", &NetworkId::new("bbn-test-5"));
        store.record(ChainFamily::Utxo, "okx", &NetworkId::new("signet"));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, [OsString::from("session.json")]);
        assert_eq!(SessionStore::load_from_file(&path).unwrap().len(), 2);
    }
}
