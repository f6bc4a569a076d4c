//! Persistent metadata store
//!
//! Single-file transactional store holding the five entity namespaces. The
//! namespaces are created inside one write transaction at open time, so
//! initialization is all-or-nothing and idempotent against an existing file.

mod entries;

pub use entries::{BrickEntry, ClusterEntry, DeviceEntry, NodeEntry, VolumeEntry};

use crate::error::{Error, Result};
use redb::{Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

// =============================================================================
// Namespaces
// =============================================================================

pub const CLUSTER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("CLUSTER");
pub const NODE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("NODE");
pub const VOLUME_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("VOLUME");
pub const DEVICE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("DEVICE");
pub const BRICK_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("BRICK");

/// Every namespace the service requires before the first request is accepted
const ALL_TABLES: [TableDefinition<&str, &[u8]>; 5] = [
    CLUSTER_TABLE,
    NODE_TABLE,
    VOLUME_TABLE,
    DEVICE_TABLE,
    BRICK_TABLE,
];

/// Bound on how long we wait for the store file lock
const OPEN_TIMEOUT: Duration = Duration::from_secs(3);

/// Delay between lock acquisition attempts
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// MetaStore
// =============================================================================

/// Handle to the opened, fully-initialized metadata store.
///
/// Values are JSON-serialized records keyed by hex id strings. The underlying
/// store serializes writers against each other and never blocks readers.
pub struct MetaStore {
    db: Database,
}

impl MetaStore {
    /// Open (creating if absent) the store at `path` and ensure all five
    /// namespaces exist.
    ///
    /// Fails without returning a handle if the file lock cannot be acquired
    /// within the open timeout or if namespace creation fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let db = open_with_timeout(path)?;
        restrict_permissions(path)?;

        // All five namespaces in a single write transaction
        let txn = db.begin_write().map_err(|e| {
            error!("Unable to begin store initialization: {}", e);
            Error::from(e)
        })?;
        for table in ALL_TABLES {
            if let Err(e) = txn.open_table(table) {
                error!("Unable to create {} namespace in store", table.name());
                return Err(e.into());
            }
        }
        txn.commit()?;

        info!("Metadata store ready at {}", path.display());
        Ok(Self { db })
    }

    /// Insert or replace a record
    pub fn put<T: Serialize>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        id: &str,
        value: &T,
    ) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(table)?;
            t.insert(id, data.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Fetch a record, `None` if absent
    pub fn get<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        id: &str,
    ) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        match t.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Remove a record; returns whether it existed
    pub fn delete(&self, table: TableDefinition<&str, &[u8]>, id: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut t = txn.open_table(table)?;
            let existed = t.remove(id)?.is_some();
            existed
        };
        txn.commit()?;
        Ok(existed)
    }

    /// All record ids in a namespace, in key order
    pub fn list_ids(&self, table: TableDefinition<&str, &[u8]>) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        let mut ids = Vec::new();
        for item in t.iter()? {
            let (key, _) = item?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    /// All records in a namespace, in key order
    pub fn list<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
    ) -> Result<Vec<T>> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        let mut records = Vec::new();
        for item in t.iter()? {
            let (_, value) = item?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Names of the namespaces present in the store file
    pub fn table_names(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let names = txn
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .collect();
        Ok(names)
    }
}

// =============================================================================
// Open Helpers
// =============================================================================

fn open_with_timeout(path: &Path) -> Result<Database> {
    let deadline = Instant::now() + OPEN_TIMEOUT;
    loop {
        match Database::create(path) {
            Ok(db) => return Ok(db),
            Err(e) if is_lock_contention(&e) && Instant::now() < deadline => {
                std::thread::sleep(OPEN_RETRY_INTERVAL);
            }
            Err(e) => {
                error!("Unable to open store {}: {}", path.display(), e);
                return Err(Error::StoreOpen {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn is_lock_contention(e: &DatabaseError) -> bool {
    match e {
        DatabaseError::DatabaseAlreadyOpen => true,
        DatabaseError::Storage(StorageError::Io(io)) => {
            io.kind() == std::io::ErrorKind::WouldBlock
        }
        _ => false,
    }
}

/// Restrict the store file to owner read/write
fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path().join("meta.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_all_namespaces() {
        let (_dir, store) = temp_store();
        let mut names = store.table_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["BRICK", "CLUSTER", "DEVICE", "NODE", "VOLUME"]);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.db");

        {
            let store = MetaStore::open(&path).unwrap();
            store
                .put(CLUSTER_TABLE, "0a1b", &ClusterEntry::new("0a1b"))
                .unwrap();
        }

        // Second open against the existing file must not fail or lose data
        let store = MetaStore::open(&path).unwrap();
        assert_eq!(store.table_names().unwrap().len(), 5);
        let entry: Option<ClusterEntry> = store.get(CLUSTER_TABLE, "0a1b").unwrap();
        assert!(entry.is_some());
    }

    #[test]
    fn test_put_get_delete_roundtrip() {
        let (_dir, store) = temp_store();

        let entry = ClusterEntry::new("ff00");
        store.put(CLUSTER_TABLE, &entry.id, &entry).unwrap();

        let fetched: Option<ClusterEntry> = store.get(CLUSTER_TABLE, "ff00").unwrap();
        assert_eq!(fetched.unwrap().id, "ff00");

        assert!(store.delete(CLUSTER_TABLE, "ff00").unwrap());
        assert!(!store.delete(CLUSTER_TABLE, "ff00").unwrap());
        let gone: Option<ClusterEntry> = store.get(CLUSTER_TABLE, "ff00").unwrap();
        assert!(gone.is_none());
    }

    #[test]
    fn test_list_ids_ordered() {
        let (_dir, store) = temp_store();
        for id in ["03", "01", "02"] {
            store.put(NODE_TABLE, id, &serde_json::json!({"id": id})).unwrap();
        }
        assert_eq!(store.list_ids(NODE_TABLE).unwrap(), vec!["01", "02", "03"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.db");
        let _store = MetaStore::open(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
