//! Snapshot storage.
//!
//! The economy core only produces and consumes [`StateSnapshot`] values;
//! where they live is up to a [`SnapshotStore`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::economy::snapshot::StateSnapshot;
use crate::error::{PersistenceError, SnapshotError};

pub trait SnapshotStore: Send + Sync {
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), PersistenceError>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<StateSnapshot>, PersistenceError>;
}

/// Single JSON file on disk.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-save leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| self.io_error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        tracing::debug!("saved snapshot to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<StateSnapshot>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let snapshot = StateSnapshot::from_json(&json)?;

        tracing::debug!("loaded snapshot from {}", self.path.display());
        Ok(Some(snapshot))
    }
}

/// In-memory store for tests and embedding. Keeps the encoded JSON so the
/// same version checks run as for a file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a complete string.
        self.json.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, snapshot: &StateSnapshot) -> Result<(), PersistenceError> {
        let json = snapshot.to_json()?;
        *self.slot() = Some(json);
        Ok(())
    }

    fn load(&self) -> Result<Option<StateSnapshot>, PersistenceError> {
        match self.slot().as_deref() {
            Some(json) => Ok(Some(StateSnapshot::from_json(json)?)),
            None => Ok(None),
        }
    }
}

/// Load a snapshot, treating an unreadable or incompatible one as absent so
/// the caller can start fresh. I/O failures are still reported.
pub fn load_or_discard(store: &dyn SnapshotStore) -> Result<Option<StateSnapshot>, PersistenceError> {
    match store.load() {
        Ok(found) => Ok(found),
        Err(PersistenceError::Snapshot(e @ SnapshotError::Parse(_)))
        | Err(PersistenceError::Snapshot(e @ SnapshotError::IncompatibleVersion { .. })) => {
            tracing::warn!("discarding unusable snapshot: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::config::EconomyConfig;
    use crate::economy::Game;

    fn snapshot() -> StateSnapshot {
        let mut game = Game::new(EconomyConfig::default()).unwrap();
        for _ in 0..30 {
            game.click_action();
        }
        game.purchase_building("grower");
        game.snapshot(42)
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("saves").join("game.json"));
        assert!(store.load().unwrap().is_none());

        let snap = snapshot();
        store.save(&snap).unwrap();
        assert_eq!(store.load().unwrap(), Some(snap));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("game.json"));
        store.save(&StateSnapshot { saved_at: 1, ..snapshot() }).unwrap();
        store.save(&StateSnapshot { saved_at: 2, ..snapshot() }).unwrap();
        assert_eq!(store.load().unwrap().unwrap().saved_at, 2);
    }

    #[test]
    fn corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, "{ definitely not").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(PersistenceError::Snapshot(SnapshotError::Parse(_)))
        ));
        assert!(load_or_discard(&store).unwrap().is_none());
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        let snap = snapshot();
        store.save(&snap).unwrap();
        assert_eq!(store.load().unwrap(), Some(snap));
    }
}
