//! Field-level package transforms

use tracing::trace;

use crate::policy::Transform;
use crate::types::Package;

/// Transform in effect for a pull: its own, else the target's
pub fn effective<'a>(
    pull_transform: Option<&'a Transform>,
    target_transform: Option<&'a Transform>,
) -> Option<&'a Transform> {
    pull_transform.or(target_transform)
}

/// Build a new package with `exclude_fields` dropped, then `rename_fields`
/// applied one after another.
///
/// A rename of a field that is absent (or was just excluded) does nothing.
/// The renamed value replaces an existing field of the new name in place,
/// otherwise it is appended.
pub fn apply(package: &Package, transform: Option<&Transform>) -> Package {
    let Some(transform) = transform else {
        return package.clone();
    };

    let mut fields = package.fields().clone();
    for field in &transform.exclude_fields {
        fields.shift_remove(field);
    }
    for (old, new) in &transform.rename_fields {
        if old == new {
            continue;
        }
        if let Some(value) = fields.shift_remove(old) {
            trace!("Renaming field '{old}' to '{new}'");
            fields.insert(new.clone(), value);
        }
    }
    Package::new(fields)
}
