//! JSON record files and content digests.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::TrackingError;

/// Write `value` as pretty JSON, replacing `path` atomically.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TrackingError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| TrackingError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, &bytes)
}

/// Write raw bytes, replacing `path` atomically.
pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), TrackingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TrackingError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| TrackingError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| TrackingError::io(path, e))
}

/// Read a JSON record.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, TrackingError> {
    let bytes = fs::read(path).map_err(|e| TrackingError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| TrackingError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Reject names that cannot safely become a single directory component.
pub(crate) fn check_name(name: &str) -> Result<(), TrackingError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(TrackingError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn names_must_be_path_safe() {
        assert!(check_name("california_housing-v2.1").is_ok());
        for bad in ["", "..", "a/b", "a b", "x\\y"] {
            assert!(check_name(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn json_round_trip_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/record.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        let back: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(back["a"], 1);
        assert!(!path.with_extension("tmp").exists());
    }
}
