//! Catalog Adapter Library
//!
//! Turns per-architecture / OS source feature lists into role-oriented
//! target configuration files, driven by a declarative adapter policy.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod generator;
pub mod json_file;
pub mod logging;
pub mod policy;
pub mod source_cache;
pub mod types;
pub mod writer;

// Re-export main types for convenience
pub use catalog::{CatalogValidator, CommandValidator, JsonDocumentCheck};
pub use config::{FailureMode, LogLevel, RunConfig};
pub use error::{AdapterError, InputKind, Result};
pub use generator::{RunSummary, UnitOutcome, generate, generate_from_catalog, generate_with_validator};
pub use policy::PolicyDocument;
pub use source_cache::{SourceCache, SourceLookup};
pub use types::{Combination, Package, SourceDocument, TargetObject};
