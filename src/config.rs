//! Run configuration
//!
//! Every setting of a run lives in `RunConfig`. It can be saved to and
//! loaded from a JSON file; command-line flags are layered on top of the
//! file by the CLI.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::policy::DEFAULT_POLICY_PATH;

/// Default catalog schema location
pub const DEFAULT_SCHEMA_PATH: &str = "resources/CatalogSchema.json";

/// Default root of the per-combination source files
pub const DEFAULT_INPUT_DIR: &str = "out/main";

/// Default root of the generated target files
pub const DEFAULT_OUTPUT_DIR: &str = "out/adapter/input/config";

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// What to do when a unit fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailureMode {
    /// Process every unit, then report all failures
    #[default]
    KeepGoing,
    /// Stop handing out units after the first failure
    FailFast,
}

/// Settings for one adapter run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub catalog: PathBuf,
    pub schema: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub policy: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,

    /// Worker threads; available parallelism when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    pub failure_mode: FailureMode,

    pub skip_catalog_check: bool,
    /// External validator command with `{catalog}` and `{schema}` placeholders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_validator: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::new(),
            schema: PathBuf::from(DEFAULT_SCHEMA_PATH),
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            policy: PathBuf::from(DEFAULT_POLICY_PATH),
            log_file: None,
            log_level: LogLevel::default(),
            jobs: None,
            failure_mode: FailureMode::default(),
            skip_catalog_check: false,
            catalog_validator: None,
        }
    }
}

impl RunConfig {
    /// Defaults with the given catalog
    pub fn new(catalog: impl Into<PathBuf>) -> Self {
        Self {
            catalog: catalog.into(),
            ..Self::default()
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize run configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write run configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read run configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse run configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.catalog.as_os_str().is_empty() {
            anyhow::bail!("Catalog path must be specified");
        }

        for (name, path) in [
            ("Schema", &self.schema),
            ("Input directory", &self.input_dir),
            ("Output directory", &self.output_dir),
            ("Policy", &self.policy),
        ] {
            if path.as_os_str().is_empty() {
                anyhow::bail!("{name} path must not be empty");
            }
        }

        if self.jobs == Some(0) {
            anyhow::bail!("Worker count must be at least 1");
        }

        if let Some(command) = &self.catalog_validator {
            if command.trim().is_empty() {
                anyhow::bail!("Catalog validator command must not be empty");
            }
        }

        Ok(())
    }

    /// Number of worker threads to start
    pub fn worker_count(&self) -> usize {
        self.jobs
            .filter(|&n| n > 0)
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }
}
