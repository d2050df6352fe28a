//! Report file output.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::ModelError;

pub(crate) fn ensure_parent(path: &Path) -> Result<(), ModelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ModelError::io(parent, e))?;
    }
    Ok(())
}

/// Pretty-printed JSON, parent directories created as needed.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    ensure_parent(path)?;
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    fs::write(path, bytes).map_err(|e| ModelError::io(path, e))
}

pub(crate) fn write_text(path: &Path, text: &str) -> Result<(), ModelError> {
    ensure_parent(path)?;
    fs::write(path, text).map_err(|e| ModelError::io(path, e))
}
