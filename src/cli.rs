use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{FailureMode, LogLevel, RunConfig};
use crate::error::{AdapterError, InputKind};

/// Catalog adapter - generate role-oriented package configs from catalog feature lists
#[derive(Parser, Debug)]
#[command(name = "catalog-adapter")]
#[command(about = "Generate role-oriented package configuration files driven by an adapter policy")]
#[command(version)]
pub struct Cli {
    /// Catalog JSON file (required unless set in --config)
    #[arg(long, required_unless_present = "config")]
    pub catalog: Option<PathBuf>,

    /// Catalog schema file [default: resources/CatalogSchema.json]
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Root of the per-combination source files [default: out/main]
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Root of the generated target files [default: out/adapter/input/config]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Adapter policy file [default: resources/adapter_policy_default.json]
    #[arg(long)]
    pub policy: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log level (debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Worker threads [default: available CPUs]
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Stop after the first failed target instead of processing the rest
    #[arg(long)]
    pub fail_fast: bool,

    /// Do not run the catalog validator
    #[arg(long)]
    pub skip_catalog_check: bool,

    /// External catalog validator command; `{catalog}` and `{schema}` are substituted
    #[arg(long)]
    pub catalog_validator: Option<String>,

    /// JSON run configuration file; flags given here override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Merge the optional configuration file with the flags and validate the result
    pub fn into_run_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)
                .with_context(|| format!("Failed to load run configuration {:?}", path))?,
            None => RunConfig::default(),
        };

        if let Some(catalog) = self.catalog {
            config.catalog = catalog;
        }
        if let Some(schema) = self.schema {
            config.schema = schema;
        }
        if let Some(input_dir) = self.input_dir {
            config.input_dir = input_dir;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if self.log_file.is_some() {
            config.log_file = self.log_file;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.fail_fast {
            config.failure_mode = FailureMode::FailFast;
        }
        if self.skip_catalog_check {
            config.skip_catalog_check = true;
        }
        if self.catalog_validator.is_some() {
            config.catalog_validator = self.catalog_validator;
        }

        if config.catalog.as_os_str().is_empty() {
            return Err(AdapterError::input_not_found(InputKind::Catalog, &config.catalog).into());
        }
        config.validate()?;
        Ok(config)
    }
}
