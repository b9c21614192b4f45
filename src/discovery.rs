//! Combination discovery
//!
//! Source files live under `<input_dir>/<arch>/<os_family>/<os_version>/`.
//! Every directory found at the third level is one combination.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{AdapterError, InputKind, Result};
use crate::types::Combination;

/// List every (arch, os_family, os_version) directory under `input_dir`.
///
/// Non-directories are ignored at every level. The result is sorted so runs
/// process combinations in the same order.
///
/// # Errors
///
/// `InputNotFound` if `input_dir` is not a directory, `Read` if a listing fails.
pub fn enumerate_combinations(input_dir: &Path) -> Result<Vec<Combination>> {
    if !input_dir.is_dir() {
        return Err(AdapterError::input_not_found(InputKind::InputDirectory, input_dir));
    }

    let mut combinations = Vec::new();
    for arch in subdirectories(input_dir)? {
        let arch_dir = input_dir.join(&arch);
        for os_family in subdirectories(&arch_dir)? {
            let family_dir = arch_dir.join(&os_family);
            for os_version in subdirectories(&family_dir)? {
                combinations.push(Combination::new(arch.clone(), os_family.clone(), os_version));
            }
        }
    }

    combinations.sort();
    debug!(
        "Found {} combination(s) under {}",
        combinations.len(),
        input_dir.display()
    );
    Ok(combinations)
}

/// Sorted names of the directories directly under `dir`
fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| AdapterError::read(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AdapterError::read(dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            debug!("Skipping non-directory {}", path.display());
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!("Skipping directory with non-UTF-8 name: {:?}", raw),
        }
    }
    names.sort();
    Ok(names)
}
