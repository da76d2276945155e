//! Storage slot abstraction for the persisted cache blob
//!
//! Persistence is one named slot holding a single opaque string: read once at
//! startup, written on every sweep and at teardown. Writes are last-wins and
//! not transactional; concurrent writers racing on the same slot is an
//! accepted limitation.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::errors::CacheError;

/// One named slot capable of storing a single opaque blob.
pub trait StorageSlot: Send + Sync {
    /// Read the blob, `None` when the slot has never been written.
    fn load(&self) -> Result<Option<String>, CacheError>;

    /// Replace the blob.
    fn store(&self, blob: &str) -> Result<(), CacheError>;
}

/// File-backed slot.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageSlot for FileSlot {
    fn load(&self) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Storage(e)),
        }
    }

    fn store(&self, blob: &str) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, blob)?;
        debug!("Wrote {} characters to {}", blob.chars().count(), self.path.display());
        Ok(())
    }
}

/// In-memory slot, used by tests and useful for ephemeral runs.
#[derive(Default)]
pub struct MemorySlot {
    blob: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the slot, e.g. with a legacy blob under test.
    pub fn with_blob<S: Into<String>>(blob: S) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }
}

impl StorageSlot for MemorySlot {
    fn load(&self) -> Result<Option<String>, CacheError> {
        Ok(self.blob.lock().map(|guard| guard.clone()).unwrap_or(None))
    }

    fn store(&self, blob: &str) -> Result<(), CacheError> {
        if let Ok(mut guard) = self.blob.lock() {
            *guard = Some(blob.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slot_round_trip() {
        let slot = MemorySlot::new();
        assert!(slot.load().unwrap().is_none());
        slot.store("blob").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("blob"));
    }

    #[test]
    fn file_slot_missing_file_is_empty() {
        let slot = FileSlot::new("/nonexistent/placelink/slot.blob");
        assert!(slot.load().unwrap().is_none());
    }

    #[test]
    fn file_slot_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "placelink-slot-test-{}.blob",
            std::process::id()
        ));
        let slot = FileSlot::new(&path);
        slot.store("persisted ✓").unwrap();
        assert_eq!(slot.load().unwrap().as_deref(), Some("persisted ✓"));
        let _ = std::fs::remove_file(&path);
    }
}
