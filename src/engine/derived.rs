//! Derived roles computed from roles already in the target object

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::policy::{DerivedOperation, DerivedSpec, ExtractCommon, PackageIdentity};
use crate::types::{Package, TargetObject};

/// Run one derived operation against `target`
pub fn apply_derived(derived: &DerivedSpec, target: &mut TargetObject) -> Result<()> {
    match &derived.operation {
        DerivedOperation::ExtractCommon(op) => extract_common(&derived.target_key, op, target),
    }
}

/// Identity of a package under the chosen mode. `None` means the package
/// can never be common.
fn identity_of(package: &Package, mode: PackageIdentity) -> Option<String> {
    match mode {
        PackageIdentity::Package => package.name().map(str::to_string),
        PackageIdentity::Definition => Some(package.definition_key()),
    }
}

/// Move packages shared by at least `min_occurrences` of the `from_keys`
/// roles into the role `target_key`.
///
/// The new role holds one representative per common package, taken from the
/// first role listing it, in first-appearance order across `from_keys`.
/// Classification uses the roles as they were before any removal.
///
/// # Errors
///
/// `RoleNotFound` if a `from_keys` role is missing from the target. The
/// target is left untouched in that case.
pub fn extract_common(target_key: &str, op: &ExtractCommon, target: &mut TargetObject) -> Result<()> {
    let mut from_keys: Vec<&str> = Vec::with_capacity(op.from_keys.len());
    for key in &op.from_keys {
        if !from_keys.contains(&key.as_str()) {
            from_keys.push(key);
        }
    }

    let mut roles = Vec::with_capacity(from_keys.len());
    for key in &from_keys {
        let packages = target
            .get(key)
            .ok_or_else(|| AdapterError::role_not_found(*key, "target object"))?;
        roles.push(packages);
    }

    // Count each identity once per role, remembering its first representative.
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<(String, Package)> = Vec::new();
    for packages in &roles {
        let mut in_role = HashSet::new();
        for package in *packages {
            let Some(id) = identity_of(package, op.identity) else {
                continue;
            };
            if !in_role.insert(id.clone()) {
                continue;
            }
            let count = occurrences.entry(id.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push((id, package.clone()));
            }
            *count += 1;
        }
    }

    let mut common_ids = HashSet::new();
    let mut common = Vec::new();
    for (id, package) in first_seen {
        if occurrences.get(&id).is_some_and(|&n| n >= op.min_occurrences) {
            common_ids.insert(id);
            common.push(package);
        }
    }

    debug!(
        "extract_common '{}': {} common package(s) across {:?}",
        target_key,
        common.len(),
        from_keys
    );

    if op.remove_from_sources && !common_ids.is_empty() {
        for key in &from_keys {
            target.retain_in(key, |p| {
                identity_of(p, op.identity).is_none_or(|id| !common_ids.contains(&id))
            });
        }
    }
    target.insert(target_key, common);
    Ok(())
}
