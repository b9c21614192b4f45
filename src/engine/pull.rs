//! Pull execution: copy one filtered, transformed role out of a source document

use tracing::debug;

use crate::engine::{filter, transform};
use crate::error::{AdapterError, Result};
use crate::policy::{PullSpec, Transform};
use crate::types::{Package, SourceDocument};

/// The packages one pull contributes to the target
#[derive(Debug, Clone, PartialEq)]
pub struct PulledRole {
    pub key: String,
    pub packages: Vec<Package>,
}

/// Run `pull` against `source`.
///
/// Packages are filtered first, then transformed, so a filter always sees the
/// source fields even when the transform drops them. Source order is kept.
///
/// # Errors
///
/// `RoleNotFound` when `source_key` is not a role of `source`.
pub fn execute(
    pull: &PullSpec,
    source: &SourceDocument,
    source_file: &str,
    target_transform: Option<&Transform>,
) -> Result<PulledRole> {
    let packages = source.role(&pull.source_key).ok_or_else(|| {
        AdapterError::role_not_found(&pull.source_key, format!("source file '{source_file}'"))
    })?;

    let transform = transform::effective(pull.transform.as_ref(), target_transform);
    let pulled: Vec<Package> = packages
        .iter()
        .filter(|p| filter::passes(p, pull.filter.as_ref()))
        .map(|p| transform::apply(p, transform))
        .collect();

    debug!(
        "Pulled {}/{} package(s) from '{}' in {} into '{}'",
        pulled.len(),
        packages.len(),
        pull.source_key,
        source_file,
        pull.output_key()
    );

    Ok(PulledRole {
        key: pull.output_key().to_string(),
        packages: pulled,
    })
}
