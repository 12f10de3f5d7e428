use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;
use crate::domain::ports::ImageStore;

/// Stores uploads as flat files in one directory.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    /// Creates the directory if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            DomainError::Internal(format!("cannot create upload dir {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageStore for LocalImageStore {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let path = self.root.join(filename);
        fs::write(&path, bytes)
            .map_err(|e| DomainError::Internal(format!("failed to write {}: {e}", path.display())))
    }

    fn delete(&self, filename: &str) -> Result<bool, DomainError> {
        let path = self.root.join(filename);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::Internal(format!(
                "failed to delete {}: {e}",
                path.display()
            ))),
        }
    }
}
