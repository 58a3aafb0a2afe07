// store.rs — EstateStore: persistence for estates.
//
// Each estate is stored as a JSON file named after the SHA-256 of its
// principal: `<store_dir>/<hex digest>.json`. Principals are free-form
// strings, so hashing keeps file names safe and fixed-length.

use std::fs;
use std::path::{Path, PathBuf};

use fie_types::Identity;
use sha2::{Digest, Sha256};

use crate::error::EstateError;
use crate::estate::Estate;

/// Persistent store for Estate records.
pub struct EstateStore {
    store_dir: PathBuf,
}

impl EstateStore {
    /// Create a store backed by `store_dir`, creating the directory if needed.
    pub fn new(store_dir: impl AsRef<Path>) -> Result<Self, EstateError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        fs::create_dir_all(&store_dir).map_err(|source| EstateError::IoError {
            path: store_dir.display().to_string(),
            source,
        })?;
        Ok(Self { store_dir })
    }

    /// Save an estate (creates or overwrites).
    ///
    /// Writes to a temporary file first so a crash never leaves a truncated
    /// estate behind.
    pub fn save(&self, estate: &Estate) -> Result<(), EstateError> {
        let path = self.estate_file(&estate.principal);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(estate)?;
        fs::write(&tmp, json).map_err(|source| EstateError::IoError {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| EstateError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn get(&self, principal: &Identity) -> Result<Option<Estate>, EstateError> {
        let path = self.estate_file(principal);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|source| EstateError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let estate: Estate = serde_json::from_str(&json)?;
        Ok(Some(estate))
    }

    /// List all estates, ordered by principal. Unreadable files are skipped
    /// with a warning.
    pub fn list(&self) -> Result<Vec<Estate>, EstateError> {
        let mut estates = Vec::new();

        let entries = fs::read_dir(&self.store_dir).map_err(|source| EstateError::IoError {
            path: self.store_dir.display().to_string(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| EstateError::IoError {
                path: self.store_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| EstateError::IoError {
                    path: path.display().to_string(),
                    source,
                })?;
                match serde_json::from_str::<Estate>(&json) {
                    Ok(estate) => estates.push(estate),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable estate")
                    }
                }
            }
        }

        estates.sort_by(|a, b| a.principal.cmp(&b.principal));
        Ok(estates)
    }

    pub fn delete(&self, principal: &Identity) -> Result<bool, EstateError> {
        let path = self.estate_file(principal);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| EstateError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(true)
    }

    fn estate_file(&self, principal: &Identity) -> PathBuf {
        let digest = Sha256::digest(principal.as_str().as_bytes());
        self.store_dir.join(format!("{:x}.json", digest))
    }
}
