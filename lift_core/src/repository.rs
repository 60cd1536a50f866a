//! Store persistence with file locking.
//!
//! The whole arena store is saved as one JSON document. Writes go to a temp
//! file in the same directory and are renamed over the target, so a crash
//! mid-save leaves the previous store intact.

use crate::{Error, Result, Store};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;

/// Where the session controller loads and saves its store
pub trait Repository {
    fn load(&self) -> Result<Store>;
    fn save(&mut self, store: &Store) -> Result<()>;
}

/// JSON file repository
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Repository for JsonFileRepository {
    /// Load the store with shared locking
    ///
    /// Returns an empty store if the file doesn't exist. If the file is
    /// unreadable or corrupted, logs a warning and returns an empty store.
    fn load(&self) -> Result<Store> {
        let path = &self.path;
        if !path.exists() {
            tracing::info!("No store file at {:?}, starting empty", path);
            return Ok(Store::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open store file {:?}: {}. Starting empty.", path, e);
                return Ok(Store::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock store file {:?}: {}. Starting empty.", path, e);
            return Ok(Store::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read store file {:?}: {}. Starting empty.", path, e);
            return Ok(Store::default());
        }

        file.unlock()?;

        match serde_json::from_str::<Store>(&contents) {
            Ok(store) => {
                tracing::debug!(
                    "Loaded store from {:?}: {} sessions, {} sets",
                    path,
                    store.sessions.len(),
                    store.sets.len()
                );
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse store file {:?}: {}. Starting empty.", path, e);
                Ok(Store::default())
            }
        }
    }

    /// Save the store atomically with exclusive locking
    fn save(&mut self, store: &Store) -> Result<()> {
        let path = &self.path;
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(store)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved store to {:?}", path);
        Ok(())
    }
}

/// In-memory repository; clones share the same saved copy
#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
    saved: Arc<Mutex<Store>>,
    saves: Arc<AtomicUsize>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Store) -> Self {
        let repo = Self::default();
        *repo.saved.lock().unwrap_or_else(PoisonError::into_inner) = store;
        repo
    }

    /// Make every following save fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Last successfully saved store
    pub fn saved(&self) -> Store {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Repository for MemoryRepository {
    fn load(&self) -> Result<Store> {
        Ok(self.saved())
    }

    fn save(&mut self, store: &Store) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated save failure".into()));
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = store.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Session;
    use chrono::Utc;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonFileRepository::new(temp_dir.path().join("store.json"));

        let mut store = Store::new();
        crate::catalog::seed_store(&mut store);
        store.insert_session(Session::new(Utc::now()));
        repo.save(&store).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded, store);
        assert!(loaded.active_session().is_some());
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(temp_dir.path().join("missing.json"));

        let store = repo.load().unwrap();
        assert!(store.sessions.is_empty());
        assert!(store.definitions.is_empty());
    }

    #[test]
    fn test_corrupted_store_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = JsonFileRepository::new(&path).load().unwrap();
        assert!(store.sessions.is_empty());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut repo = JsonFileRepository::new(temp_dir.path().join("store.json"));
        repo.save(&Store::new()).unwrap();
        repo.save(&Store::new()).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "store.json")
            .collect();
        assert!(extras.is_empty(), "Expected only store.json, found extras: {:?}", extras);
    }

    #[test]
    fn test_memory_repository_failures() {
        let mut repo = MemoryRepository::new();
        repo.save(&Store::new()).unwrap();
        assert_eq!(repo.save_count(), 1);

        repo.set_fail_saves(true);
        assert!(matches!(repo.save(&Store::new()), Err(Error::Persistence(_))));
        assert_eq!(repo.save_count(), 1);
    }
}
