//! Target assembly for one (target file, combination) unit

use tracing::debug;

use crate::engine::{derived, pull};
use crate::error::Result;
use crate::policy::TargetSpec;
use crate::source_cache::SourceLookup;
use crate::types::{Combination, TargetObject};

/// Build the target object for one unit.
///
/// Returns `None` when the target's conditions exclude `combination`.
/// Pulls run in declaration order (a later pull into the same key replaces
/// the earlier one), then derived operations run in declaration order.
///
/// # Errors
///
/// Missing source files, missing roles and malformed source JSON.
pub fn assemble_target(
    target_file: &str,
    spec: &TargetSpec,
    combination: &Combination,
    sources: &dyn SourceLookup,
) -> Result<Option<TargetObject>> {
    if !spec.conditions.as_ref().is_none_or(|c| c.matches(combination)) {
        debug!("Skipping {target_file} for {combination}: conditions not met");
        return Ok(None);
    }

    let mut target = TargetObject::new();
    for source in &spec.sources {
        let doc = sources.source(combination, &source.source_file)?;
        for pull_spec in &source.pulls {
            let pulled = pull::execute(pull_spec, &doc, &source.source_file, spec.transform.as_ref())?;
            target.insert(pulled.key, pulled.packages);
        }
    }

    for derived_spec in &spec.derived {
        derived::apply_derived(derived_spec, &mut target)?;
    }

    Ok(Some(target))
}
