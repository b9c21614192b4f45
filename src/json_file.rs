//! JSON file loading with adapter error mapping

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{AdapterError, InputKind, Result};

/// Read and deserialize a JSON file.
///
/// A missing file is reported as `InputNotFound` with the given kind so the
/// caller's exit code reflects which input was absent.
pub fn read_json_file<T: DeserializeOwned>(path: &Path, kind: InputKind) -> Result<T> {
    if !path.is_file() {
        return Err(AdapterError::input_not_found(kind, path));
    }
    let content = fs::read_to_string(path).map_err(|e| AdapterError::read(path, e))?;
    serde_json::from_str(&content).map_err(|e| AdapterError::json(path, e))
}
