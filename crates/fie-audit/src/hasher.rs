// hasher.rs — SHA-256 hashing utilities.
//
// All hashes are SHA-256, lowercase hex. Used for the audit chain, for
// archive content hashes and for creator-identity commitments.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::AuditError;

pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hash the contents of a file on disk (archived asset payloads).
pub fn hash_file(path: &Path) -> Result<String, AuditError> {
    let data = std::fs::read(path).map_err(|source| AuditError::HashFileFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hash_bytes(&data))
}
