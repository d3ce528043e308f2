//! Record store - persist generated records and tables
//!
//! Saves each asset as a pretty JSON file named after the asset and loads
//! the directory back on startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::Record;
use crate::transform::MaterializedTable;

/// Directory where assets are stored (relative to current dir)
const DEFAULT_STORE_DIR: &str = ".sheetforge/assets";

/// What a stored asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Record,
    Table,
}

/// A stored asset with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// Asset name, also the file stem
    pub name: String,
    pub kind: AssetKind,
    /// Record class of the contents
    pub class_name: String,
    /// Save timestamp (RFC 3339)
    pub saved_at: String,
    /// One record for record assets, every row for tables
    pub records: Vec<Record>,
}

/// Receives generated records for durable storage.
pub trait RecordStore {
    /// Store one persisted record under its asset name.
    fn save_record(&mut self, record: &Record) -> StoreResult<String>;

    /// Store a whole table under `name`.
    fn save_table(&mut self, name: &str, table: &MaterializedTable) -> StoreResult<String>;

    fn list(&self) -> Vec<&StoredAsset>;

    fn load(&self, name: &str) -> StoreResult<&StoredAsset>;

    fn delete(&mut self, name: &str) -> StoreResult<()>;
}

/// Store backed by a directory of JSON files
pub struct JsonRecordStore {
    store_dir: PathBuf,
    assets: BTreeMap<String, StoredAsset>,
}

impl JsonRecordStore {
    /// Open the default store directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Open a store in a custom directory, loading existing assets
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            store_dir: PathBuf::from(dir.as_ref()),
            assets: BTreeMap::new(),
        };
        store.load_all();
        store
    }

    pub fn dir(&self) -> &Path {
        &self.store_dir
    }

    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.store_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|content| Ok(serde_json::from_str::<StoredAsset>(&content)?));
            match parsed {
                Ok(asset) => {
                    self.assets.insert(asset.name.clone(), asset);
                }
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable asset"),
            }
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.store_dir.join(format!("{}.json", name))
    }

    fn write(&mut self, asset: StoredAsset) -> StoreResult<String> {
        fs::create_dir_all(&self.store_dir)?;

        let content = serde_json::to_string_pretty(&asset)?;
        fs::write(self.path_for(&asset.name), content)?;

        let name = asset.name.clone();
        self.assets.insert(name.clone(), asset);
        Ok(name)
    }
}

impl Default for JsonRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for JsonRecordStore {
    fn save_record(&mut self, record: &Record) -> StoreResult<String> {
        let name = record
            .asset_name
            .clone()
            .unwrap_or_else(|| record.type_name.clone());
        self.write(StoredAsset {
            name,
            kind: AssetKind::Record,
            class_name: record.type_name.clone(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            records: vec![record.clone()],
        })
    }

    fn save_table(&mut self, name: &str, table: &MaterializedTable) -> StoreResult<String> {
        self.write(StoredAsset {
            name: name.to_string(),
            kind: AssetKind::Table,
            class_name: table.class_name.clone(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            records: table.records.clone(),
        })
    }

    fn list(&self) -> Vec<&StoredAsset> {
        self.assets.values().collect()
    }

    fn load(&self, name: &str) -> StoreResult<&StoredAsset> {
        self.assets
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn delete(&mut self, name: &str) -> StoreResult<()> {
        if self.assets.remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        fs::remove_file(self.path_for(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::TableStrategy;
    use crate::convert::ValueType;
    use crate::models::{RecordType, Value};
    use tempfile::tempdir;

    fn item(id: i64) -> Record {
        let mut record = RecordType::new("Item", false)
            .with_field("id", ValueType::Int)
            .instantiate();
        record.set("id", Value::Int(id));
        record.asset_name = Some(format!("Item_{}", id));
        record
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        {
            let mut store = JsonRecordStore::with_dir(dir.path());
            assert_eq!(store.save_record(&item(1)).unwrap(), "Item_1");
            assert!(dir.path().join("Item_1.json").exists());
        }

        let store = JsonRecordStore::with_dir(dir.path());
        let asset = store.load("Item_1").unwrap();
        assert_eq!(asset.kind, AssetKind::Record);
        assert_eq!(asset.records[0].get("id"), Some(&Value::Int(1)));
        assert!(chrono::DateTime::parse_from_rfc3339(&asset.saved_at).is_ok());
    }

    #[test]
    fn test_save_table() {
        let dir = tempdir().unwrap();
        let mut store = JsonRecordStore::with_dir(dir.path());
        let record_type = RecordType::new("Item", false).with_field("id", ValueType::Int);
        let table = MaterializedTable::new(
            "ItemTable",
            record_type,
            TableStrategy::PlainList,
            vec![],
            vec![item(1), item(2)],
        );

        store.save_table("ItemTable", &table).unwrap();
        let asset = store.load("ItemTable").unwrap();
        assert_eq!(asset.kind, AssetKind::Table);
        assert_eq!(asset.records.len(), 2);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let mut store = JsonRecordStore::with_dir(dir.path());
        store.save_record(&item(3)).unwrap();

        store.delete("Item_3").unwrap();
        assert!(!dir.path().join("Item_3.json").exists());
        assert!(matches!(store.delete("Item_3"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load("Item_3"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let store = JsonRecordStore::with_dir(dir.path());
        assert!(store.list().is_empty());
    }
}
