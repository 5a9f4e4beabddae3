use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::{Item, ItemsFile};

const ITEMS_FILE: &str = "items.json";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    NotFound(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
            StorageError::NotFound(id) => write!(f, "no item with id {id}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// Key-record store the core reads items from and writes them to. The
/// service treats `fetch_all` as the source of truth on every call, so
/// implementations need no change notification mechanism.
pub trait ItemStore: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<Item>, StorageError>;
    fn add(&self, item: &Item) -> Result<(), StorageError>;
    /// Replaces the stored record with the same id. `NotFound` if absent.
    fn update(&self, item: &Item) -> Result<(), StorageError>;
    /// Idempotent: removing an unknown id succeeds.
    fn remove(&self, item_id: &str) -> Result<(), StorageError>;
}

/// Whole-file JSON persistence under a single data directory. Each write
/// replaces `items.json` atomically (temp file, fsync, rename), which is
/// plenty for a single-user list and keeps the file human-readable.
pub struct JsonStore {
    root: PathBuf,
    // Serializes the load-mutate-save cycle across threads.
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn items_path(&self) -> PathBuf {
        self.root.join(ITEMS_FILE)
    }

    fn load(&self) -> Result<Vec<Item>, StorageError> {
        let path = self.items_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let data: ItemsFile = serde_json::from_str(&buf)?;
        Ok(data.items)
    }

    fn save(&self, items: Vec<Item>) -> Result<(), StorageError> {
        let data = ItemsFile {
            schema_version: SCHEMA_VERSION,
            items,
        };
        let path = self.items_path();
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(&data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl ItemStore for JsonStore {
    fn fetch_all(&self) -> Result<Vec<Item>, StorageError> {
        self.load()
    }

    fn add(&self, item: &Item) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut items = self.load()?;
        items.push(item.clone());
        self.save(items)
    }

    fn update(&self, item: &Item) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut items = self.load()?;
        let existing = items
            .iter_mut()
            .find(|candidate| candidate.id == item.id)
            .ok_or_else(|| StorageError::NotFound(item.id.clone()))?;
        *existing = item.clone();
        self.save(items)
    }

    fn remove(&self, item_id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut items = self.load()?;
        items.retain(|item| item.id != item_id);
        self.save(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};

    fn make_item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            title: format!("item-{id}"),
            note: None,
            category: Category::Personal,
            priority: Priority::Medium,
            due_at: None,
            completed: false,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn fetch_all_on_missing_file_returns_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        assert!(store.fetch_all().unwrap().is_empty());
    }

    #[test]
    fn add_and_fetch_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        store.ensure_dirs().unwrap();

        let item = make_item("a");
        store.add(&item).unwrap();

        let all = store.fetch_all().unwrap();
        assert_eq!(all, vec![item]);
        assert!(dir.path().join("items.json").is_file());
    }

    #[test]
    fn update_replaces_the_record_and_rejects_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        store.add(&make_item("a")).unwrap();

        let mut changed = make_item("a");
        changed.title = "renamed".to_string();
        store.update(&changed).unwrap();
        assert_eq!(store.fetch_all().unwrap()[0].title, "renamed");

        let missing = make_item("missing");
        assert!(matches!(
            store.update(&missing),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        store.add(&make_item("a")).unwrap();
        store.add(&make_item("b")).unwrap();

        store.remove("a").unwrap();
        assert_eq!(store.fetch_all().unwrap().len(), 1);
        store.remove("a").unwrap();
        assert_eq!(store.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn saved_file_carries_the_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        store.add(&make_item("a")).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("items.json")).unwrap();
        let parsed: ItemsFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_file_surfaces_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("items.json"), b"not json").unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        assert!(matches!(store.fetch_all(), Err(StorageError::Json(_))));
    }
}
