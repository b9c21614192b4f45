//! Read-through cache of source documents
//!
//! Several targets usually pull from the same source file for the same
//! combination. The cache loads each `(combination, file)` pair once and
//! hands out shared, read-only documents to every worker.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{InputKind, Result};
use crate::json_file::read_json_file;
use crate::types::{Combination, SourceDocument};

/// Anything that can produce the source document of a combination
pub trait SourceLookup: Sync {
    /// Load `file` for `combination`.
    ///
    /// # Errors
    ///
    /// `InputNotFound` if the file does not exist, `Json` if it is malformed.
    fn source(&self, combination: &Combination, file: &str) -> Result<Arc<SourceDocument>>;
}

type CacheKey = (Combination, String);

/// Source documents loaded from `<input_dir>/<arch>/<os_family>/<os_version>/<file>`
#[derive(Debug)]
pub struct SourceCache {
    input_dir: PathBuf,
    entries: Mutex<HashMap<CacheKey, Arc<SourceDocument>>>,
}

impl SourceCache {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Path of a source file for a combination
    pub fn source_path(&self, combination: &Combination, file: &str) -> PathBuf {
        self.input_dir.join(combination.relative_dir()).join(file)
    }

    /// Number of documents currently cached
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The map holds only fully loaded documents, so a poisoned lock is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<SourceDocument>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SourceLookup for SourceCache {
    fn source(&self, combination: &Combination, file: &str) -> Result<Arc<SourceDocument>> {
        let key = (combination.clone(), file.to_string());
        if let Some(doc) = self.lock().get(&key) {
            debug!("Source cache hit: {combination}/{file}");
            return Ok(Arc::clone(doc));
        }

        // Load without holding the lock; another worker may race us here.
        let path = self.source_path(combination, file);
        let loaded: SourceDocument = read_json_file(&path, InputKind::SourceFile)?;
        debug!(
            "Loaded {} role(s) from {}",
            loaded.len(),
            path.display()
        );

        let mut entries = self.lock();
        let doc = entries.entry(key).or_insert_with(|| Arc::new(loaded));
        Ok(Arc::clone(doc))
    }
}
