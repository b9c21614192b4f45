//! Adapter policy loading and validation
//!
//! The policy is read once per run and validated eagerly: every structural
//! and semantic problem is collected and reported together, before any
//! combination is processed, so a malformed policy never produces partial
//! output.

pub mod model;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{AdapterError, InputKind, Result};
use crate::json_file::read_json_file;

pub use model::{
    AnyOf, Conditions, DerivedOperation, DerivedSpec, ExtractCommon, FieldMatch, Filter, PackageIdentity,
    PolicyDocument, PullSpec, SourceSpec, TargetSpec, Transform,
};

/// Default policy location, relative to the working directory
pub const DEFAULT_POLICY_PATH: &str = "resources/adapter_policy_default.json";

/// Load and validate the policy at `policy_path`.
///
/// # Errors
///
/// - `InputNotFound` if the file does not exist
/// - `Policy` if the file is not valid JSON, does not have the policy shape
///   (missing `targets`, non-array `sources`, unknown filter or operation
///   `type`, unknown fields) or fails semantic validation
pub fn resolve(policy_path: &Path) -> Result<PolicyDocument> {
    let policy: PolicyDocument =
        read_json_file(policy_path, InputKind::Policy).map_err(|e| match e {
            AdapterError::Json { source, .. } => {
                AdapterError::policy(policy_path, vec![format!("<root>: {source}")])
            }
            other => other,
        })?;

    let problems = validate(&policy);
    if !problems.is_empty() {
        return Err(AdapterError::policy(policy_path, problems));
    }

    info!(
        "Loaded {} target(s) from {} (policy version {})",
        policy.targets.len(),
        policy_path.display(),
        policy.version
    );
    Ok(policy)
}

impl PolicyDocument {
    /// Parse and validate a policy held in memory
    pub fn from_json_str(json: &str) -> Result<Self> {
        let origin = Path::new("<inline>");
        let policy: Self = serde_json::from_str(json)
            .map_err(|e| AdapterError::policy(origin, vec![format!("<root>: {e}")]))?;
        let problems = validate(&policy);
        if !problems.is_empty() {
            return Err(AdapterError::policy(origin, problems));
        }
        Ok(policy)
    }
}

/// Semantic checks serde cannot express. Returns every problem found.
pub fn validate(policy: &PolicyDocument) -> Vec<String> {
    let mut problems = Vec::new();

    if policy.version.trim().is_empty() {
        problems.push("version: must not be empty".to_string());
    }

    for (target_file, spec) in &policy.targets {
        let at = format!("targets/{target_file}");
        if let Err(reason) = check_plain_file_name(target_file) {
            problems.push(format!("{at}: target file name {reason}"));
        }
        if let Some(transform) = &spec.transform {
            check_transform(transform, &format!("{at}/transform"), &mut problems);
        }

        for (i, source) in spec.sources.iter().enumerate() {
            let at = format!("{at}/sources/{i}");
            if let Err(reason) = check_plain_file_name(&source.source_file) {
                problems.push(format!("{at}/source_file: {reason}"));
            }
            for (j, pull) in source.pulls.iter().enumerate() {
                let at = format!("{at}/pulls/{j}");
                if pull.source_key.is_empty() {
                    problems.push(format!("{at}/source_key: must not be empty"));
                }
                if pull.target_key.as_deref() == Some("") {
                    problems.push(format!("{at}/target_key: must not be empty"));
                }
                if let Some(filter) = &pull.filter {
                    check_filter(filter, &format!("{at}/filter"), &mut problems);
                }
                if let Some(transform) = &pull.transform {
                    check_transform(transform, &format!("{at}/transform"), &mut problems);
                }
            }
        }

        for (i, derived) in spec.derived.iter().enumerate() {
            let at = format!("{at}/derived/{i}");
            if derived.target_key.is_empty() {
                problems.push(format!("{at}/target_key: must not be empty"));
            }
            match &derived.operation {
                DerivedOperation::ExtractCommon(op) => {
                    if op.from_keys.is_empty() {
                        problems.push(format!("{at}/operation/from_keys: must not be empty"));
                    }
                    if op.from_keys.iter().any(String::is_empty) {
                        problems.push(format!(
                            "{at}/operation/from_keys: role keys must not be empty"
                        ));
                    }
                    if op.min_occurrences < 2 {
                        problems.push(format!(
                            "{at}/operation/min_occurrences: must be at least 2, got {}",
                            op.min_occurrences
                        ));
                    }
                }
            }
        }
    }

    debug!("Policy validation found {} problem(s)", problems.len());
    problems
}

fn check_plain_file_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        Err("must not be empty")
    } else if name == "." || name == ".." || name.contains(['/', '\\']) {
        Err("must be a plain file name")
    } else {
        Ok(())
    }
}

fn check_filter(filter: &Filter, at: &str, problems: &mut Vec<String>) {
    match filter {
        Filter::Substring(m) | Filter::Allowlist(m) | Filter::FieldIn(m) => {
            if m.field.is_empty() {
                problems.push(format!("{at}/field: must not be empty"));
            }
            if m.values.is_empty() {
                problems.push(format!("{at}/values: must not be empty"));
            }
        }
        Filter::AnyOf(AnyOf { filters }) => {
            if filters.is_empty() {
                problems.push(format!("{at}/filters: must not be empty"));
            }
            for (i, nested) in filters.iter().enumerate() {
                check_filter(nested, &format!("{at}/filters/{i}"), problems);
            }
        }
    }
}

fn check_transform(transform: &Transform, at: &str, problems: &mut Vec<String>) {
    for (old, new) in &transform.rename_fields {
        if new.is_empty() {
            problems.push(format!("{at}/rename_fields/{old}: new name must not be empty"));
        }
    }
}
