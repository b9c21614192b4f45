//! Catalog input gate
//!
//! The adapter does not check catalog structure itself. Before any source
//! file is read, the catalog and its schema must exist and are handed to a
//! `CatalogValidator`. The default validator only requires both to be JSON
//! documents; `CommandValidator` delegates to an external tool.

use std::path::Path;
use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AdapterError, InputKind, Result};
use crate::json_file::read_json_file;

/// Placeholder replaced by the catalog path in validator commands
pub const CATALOG_PLACEHOLDER: &str = "{catalog}";

/// Placeholder replaced by the schema path in validator commands
pub const SCHEMA_PLACEHOLDER: &str = "{schema}";

/// Seam for the external catalog schema validator
pub trait CatalogValidator: Send + Sync {
    /// Accept or reject `catalog` against `schema`.
    ///
    /// # Errors
    ///
    /// `Catalog` when the catalog is rejected, `InputNotFound` when either
    /// file is missing.
    fn validate(&self, catalog: &Path, schema: &Path) -> Result<()>;
}

/// Require both files to exist. Runs before any validator.
pub fn check_catalog_inputs(catalog: &Path, schema: &Path) -> Result<()> {
    if !catalog.is_file() {
        return Err(AdapterError::input_not_found(InputKind::Catalog, catalog));
    }
    if !schema.is_file() {
        return Err(AdapterError::input_not_found(InputKind::Schema, schema));
    }
    Ok(())
}

/// Default validator: both files must parse as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentCheck;

impl CatalogValidator for JsonDocumentCheck {
    fn validate(&self, catalog: &Path, schema: &Path) -> Result<()> {
        let _: Value = read_json_file(schema, InputKind::Schema)?;
        let _: Value = read_json_file(catalog, InputKind::Catalog)?;
        debug!("Catalog {} and schema {} are JSON documents", catalog.display(), schema.display());
        Ok(())
    }
}

/// Runs an external command; a non-zero exit rejects the catalog.
///
/// The template is split on whitespace and `{catalog}` / `{schema}` are
/// substituted in each argument, e.g.
/// `check-jsonschema --schemafile {schema} {catalog}`.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    template: Vec<String>,
}

impl CommandValidator {
    pub fn new(template: &str) -> Result<Self> {
        let template: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if template.is_empty() {
            return Err(AdapterError::config("catalog validator command is empty"));
        }
        Ok(Self { template })
    }

    /// Program and arguments for one invocation
    pub fn command_line(&self, catalog: &Path, schema: &Path) -> Vec<String> {
        let catalog = catalog.to_string_lossy();
        let schema = schema.to_string_lossy();
        self.template
            .iter()
            .map(|arg| {
                arg.replace(CATALOG_PLACEHOLDER, &catalog)
                    .replace(SCHEMA_PLACEHOLDER, &schema)
            })
            .collect()
    }
}

impl CatalogValidator for CommandValidator {
    fn validate(&self, catalog: &Path, schema: &Path) -> Result<()> {
        let argv = self.command_line(catalog, schema);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AdapterError::config("catalog validator command is empty"))?;
        info!("Validating catalog: {} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AdapterError::catalog(format!("failed to run '{program}': {e}")))?;

        if output.status.success() {
            debug!("Catalog validator accepted {}", catalog.display());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() { stdout.trim() } else { stderr.trim() };
        Err(AdapterError::catalog(format!(
            "'{}' exited with {}: {}",
            program,
            output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}")),
            detail
        )))
    }
}
