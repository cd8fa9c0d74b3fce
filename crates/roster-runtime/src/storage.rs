//! Key/value slot storage for the persisted user list.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        UserStore                              │
//! │   - Serializes the user list to one JSON string               │
//! │   - Reads it back on create, writes after every commit        │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    KeyValueStorage                            │
//! │   - MemoryStorage: in-process map (tests, ephemeral runs)     │
//! │   - FileStorage: JSON file of key → string slots              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: backends never panic; failures are returned
//!    as [`StorageError`] and the caller decides how loud to be.
//! 2. **Atomic writes**: [`FileStorage`] writes `{path}.tmp`, syncs, then
//!    renames over the target.
//! 3. **Opaque values**: slots hold strings; backends never inspect them.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned, no partial write visible |
//! | `StorageError::Serialization` | Slot file is not valid JSON | Returned from reads |
//! | `StorageError::Corruption` | Poisoned lock | Returned |
//! | Unknown `format_version` | File from a newer build | Slots treated as empty, logged |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from slot storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// The slot file could not be encoded or decoded.
    Serialization(String),
    /// Internal state is unusable (e.g. a poisoned lock).
    Corruption(String),
    /// The backend refuses writes.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Corruption(msg) => write!(f, "storage corruption: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serialization(_)
            | StorageError::Corruption(_)
            | StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A string-valued key/value store.
///
/// Implementations must be `Send + Sync` so a handle can be shared between
/// the store and whoever inspects it (tests, debug tooling).
pub trait KeyValueStorage: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read a slot. A missing slot is `Ok(None)`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a slot, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a slot. Deleting a missing slot is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Delete every slot.
    fn clear(&self) -> StorageResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// In-process storage for tests and runs that do not need to survive a
/// restart.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of slots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().map(|g| g.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Corruption("lock poisoned".into())
}

impl KeyValueStorage for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self.data.read().map_err(|_| poisoned())?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| poisoned())?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| poisoned())?;
        guard.remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| poisoned())?;
        guard.clear();
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("entries", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk layout of a [`FileStorage`] file.
#[derive(Serialize, Deserialize)]
struct SlotFile {
    /// Format version for future migrations.
    format_version: u32,
    slots: BTreeMap<String, String>,
}

impl SlotFile {
    const FORMAT_VERSION: u32 = 1;

    fn new(slots: BTreeMap<String, String>) -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            slots,
        }
    }
}

/// JSON-file storage.
///
/// # File Format
///
/// ```json
/// {
///   "format_version": 1,
///   "slots": {
///     "crud-users": "[{\"id\":\"1\", ...}]"
///   }
/// }
/// ```
///
/// Every write rewrites the whole file through `{path}.tmp` and a rename.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Storage at the default location for `app_name`.
    ///
    /// Uses `$XDG_STATE_HOME/{app_name}/slots.json`, falling back to
    /// `~/.local/state` and finally the current directory.
    #[must_use]
    pub fn default_for_app(app_name: &str) -> Self {
        Self::new(state_dir().join(app_name).join("slots.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    fn read_slots(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let file: SlotFile = serde_json::from_reader(reader).map_err(|e| {
            StorageError::Serialization(format!("failed to parse slot file: {e}"))
        })?;
        if file.format_version != SlotFile::FORMAT_VERSION {
            tracing::warn!(
                stored = file.format_version,
                expected = SlotFile::FORMAT_VERSION,
                path = %self.path.display(),
                "slot file format version mismatch, ignoring stored slots"
            );
            return Ok(BTreeMap::new());
        }
        Ok(file.slots)
    }

    fn write_slots(&self, slots: BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let count = slots.len();
        let tmp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, &SlotFile::new(slots))?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), slots = count, "saved slot file");
        Ok(())
    }
}

fn state_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("state");
    }
    PathBuf::from(".")
}

impl KeyValueStorage for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_slots()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        // A corrupt file is replaced rather than blocking every future write.
        let mut slots = self.read_slots().unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "discarding unreadable slot file"
            );
            BTreeMap::new()
        });
        slots.insert(key.to_string(), value.to_string());
        self.write_slots(slots)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut slots = self.read_slots()?;
        if slots.remove(key).is_some() {
            self.write_slots(slots)?;
        }
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_storage_basic_operations() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.get("k").unwrap(), None);

        storage.set("k", "v1").unwrap();
        storage.set("k", "v2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.len(), 1);

        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn memory_storage_with_entries_and_clear() {
        let storage = MemoryStorage::with_entries([("a", "1"), ("b", "2")]);
        assert_eq!(storage.len(), 2);
        storage.clear().unwrap();
        assert!(storage.is_empty());
        assert_eq!(storage.name(), "MemoryStorage");
    }

    #[test]
    fn storage_error_display() {
        let io_err = StorageError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        assert!(io_err.to_string().contains("I/O error"));
        assert!(std::error::Error::source(&io_err).is_some());

        let corrupt = StorageError::Corruption("bad data".into());
        assert!(corrupt.to_string().contains("corruption"));

        let unavail = StorageError::Unavailable("read-only".into());
        assert!(unavail.to_string().contains("unavailable"));
    }

    #[test]
    fn file_storage_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slots.json");
        let storage = FileStorage::new(&path);

        storage.set("crud-users", "[]").unwrap();
        storage.set("other", "x").unwrap();
        assert!(path.exists());

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("crud-users").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn file_storage_load_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path().join("nope.json"));
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dirs").join("slots.json");
        let storage = FileStorage::new(&path);
        assert!(!path.parent().unwrap().exists());
        storage.set("k", "v").unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_storage_remove_and_clear() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slots.json");
        let storage = FileStorage::new(&path);
        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
        storage.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn file_storage_corrupt_file_is_an_error_on_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slots.json");
        fs::write(&path, "not json").unwrap();
        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("k"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn file_storage_corrupt_file_is_replaced_on_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slots.json");
        fs::write(&path, "{{{").unwrap();
        let storage = FileStorage::new(&path);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn file_storage_ignores_unknown_format_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("slots.json");
        fs::write(&path, r#"{"format_version":99,"slots":{"k":"v"}}"#).unwrap();
        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("k").unwrap(), None);
    }
}
