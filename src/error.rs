//! Error handling module for the catalog adapter
//!
//! Provides the error taxonomy shared by the library and the CLI. Every
//! error maps onto one of two process exit codes: a missing required input
//! (`2`) or any other processing failure (`3`).

use std::path::{Path, PathBuf};

use strum::Display;
use thiserror::Error;

use crate::types::Combination;

/// Exit code when a required input file or directory is missing
pub const EXIT_INPUT_NOT_FOUND: i32 = 2;

/// Exit code for every other processing failure
pub const EXIT_PROCESSING_ERROR: i32 = 3;

/// Which required input was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InputKind {
    #[strum(serialize = "Catalog file")]
    Catalog,
    #[strum(serialize = "Catalog schema file")]
    Schema,
    #[strum(serialize = "Adapter policy file")]
    Policy,
    #[strum(serialize = "Input directory")]
    InputDirectory,
    #[strum(serialize = "Source file")]
    SourceFile,
    #[strum(serialize = "Run configuration file")]
    RunConfig,
}

/// Main error type for the catalog adapter
#[derive(Error, Debug)]
pub enum AdapterError {
    /// A required input file or directory does not exist
    #[error("{kind} not found: {}", path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    /// Reading a file or listing a directory failed
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON input could not be parsed
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing an output file failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The policy document is malformed or fails validation
    #[error("Adapter policy validation failed.\nPolicy: {}\n{}", path.display(), problems.join("\n"))]
    Policy { path: PathBuf, problems: Vec<String> },

    /// A pull or derived operation referenced a role that does not exist
    #[error("Role '{role}' not found in {location}")]
    RoleNotFound { role: String, location: String },

    /// The external catalog validator rejected the catalog
    #[error("Catalog validation failed: {0}")]
    Catalog(String),

    /// Invalid run settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single (target, combination) unit failed
    #[error("{target} [{combination}]: {source}")]
    Unit {
        target: String,
        combination: Combination,
        #[source]
        source: Box<AdapterError>,
    },

    /// One or more units failed during a run
    #[error("{failed} of {total} unit(s) failed; first failure: {first}")]
    UnitsFailed {
        failed: usize,
        total: usize,
        only_missing_inputs: bool,
        first: Box<AdapterError>,
    },
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

// Convenient error constructors
impl AdapterError {
    /// Create an input-not-found error
    pub fn input_not_found(kind: InputKind, path: impl AsRef<Path>) -> Self {
        Self::InputNotFound {
            kind,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a read error
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a JSON parse error
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a write error
    pub fn write(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a policy validation error
    pub fn policy(path: impl AsRef<Path>, problems: Vec<String>) -> Self {
        Self::Policy {
            path: path.as_ref().to_path_buf(),
            problems,
        }
    }

    /// Create a role-not-found error
    pub fn role_not_found(role: impl Into<String>, location: impl Into<String>) -> Self {
        Self::RoleNotFound {
            role: role.into(),
            location: location.into(),
        }
    }

    /// Create a catalog validation error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Attach unit context to an error
    pub fn unit(target: impl Into<String>, combination: &Combination, source: AdapterError) -> Self {
        Self::Unit {
            target: target.into(),
            combination: combination.clone(),
            source: Box::new(source),
        }
    }

    /// True when this error (or the error it wraps) is a missing input
    pub fn is_input_not_found(&self) -> bool {
        match self {
            Self::InputNotFound { .. } => true,
            Self::Unit { source, .. } => source.is_input_not_found(),
            Self::UnitsFailed {
                only_missing_inputs,
                ..
            } => *only_missing_inputs,
            _ => false,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_input_not_found() {
            EXIT_INPUT_NOT_FOUND
        } else {
            EXIT_PROCESSING_ERROR
        }
    }
}
