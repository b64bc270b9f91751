//! File-backed implementation of the [`VisitorStore`] port.
//!
//! The server-issued visitor identity is a single opaque line in a file
//! under the platform data directory. It is read at session start and
//! rewritten whenever the server issues a new one.

use confab_core::ports::VisitorStore;
use confab_types::error::IdentityError;
use confab_types::ids::VisitorId;

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FileVisitorStore {
    path: PathBuf,
}

impl FileVisitorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory
    /// (e.g. `~/.local/share/confab/visitor-id`).
    pub fn default_location() -> Result<Self, IdentityError> {
        let dir = dirs::data_dir()
            .ok_or_else(|| IdentityError::Storage("no platform data directory".to_string()))?;
        Ok(Self::new(dir.join("confab").join("visitor-id")))
    }
}

impl VisitorStore for FileVisitorStore {
    fn load(&self) -> Result<Option<VisitorId>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let id = contents.trim();
                Ok((!id.is_empty()).then(|| VisitorId::new(id)))
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(IdentityError::Storage(error.to_string())),
        }
    }

    fn store(&self, visitor_id: &VisitorId) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| IdentityError::Storage(e.to_string()))?;
        }
        fs::write(&self.path, visitor_id.as_str())
            .map_err(|e| IdentityError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVisitorStore::new(dir.path().join("visitor-id"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_store_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVisitorStore::new(dir.path().join("nested").join("visitor-id"));
        store.store(&VisitorId::new("v-123")).unwrap();
        assert_eq!(store.load().unwrap(), Some(VisitorId::new("v-123")));
    }

    #[test]
    fn test_store_overwrites_previous_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVisitorStore::new(dir.path().join("visitor-id"));
        store.store(&VisitorId::new("old")).unwrap();
        store.store(&VisitorId::new("new")).unwrap();
        assert_eq!(store.load().unwrap(), Some(VisitorId::new("new")));
    }

    #[test]
    fn test_blank_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visitor-id");
        fs::write(&path, "  \n").unwrap();
        let store = FileVisitorStore::new(path);
        assert_eq!(store.load().unwrap(), None);
    }
}
