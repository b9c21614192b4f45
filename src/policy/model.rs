//! Policy document model
//!
//! The policy is a declarative JSON document mapping each target file to the
//! roles it pulls from source files and the roles it derives from them.
//!
//! ```json
//! {
//!   "version": "2.0.0",
//!   "targets": {
//!     "service_k8s.json": {
//!       "transform": { "exclude_fields": ["architecture"] },
//!       "sources": [{
//!         "source_file": "functional_layer.json",
//!         "pulls": [
//!           { "source_key": "K8S Controller", "target_key": "service_kube_control_plane" },
//!           { "source_key": "K8S Worker", "target_key": "service_kube_node" }
//!         ]
//!       }],
//!       "derived": [{
//!         "target_key": "service_k8s",
//!         "operation": {
//!           "type": "extract_common",
//!           "from_keys": ["service_kube_control_plane", "service_kube_node"],
//!           "min_occurrences": 2,
//!           "remove_from_sources": true
//!         }
//!       }]
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::Display;

use crate::types::{Combination, PACKAGE_FIELD};

/// Root of the adapter policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target filename → how to build it
    pub targets: BTreeMap<String, TargetSpec>,
}

/// How one target file is assembled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Only build this target for matching combinations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,

    /// Applied to every pull that has no transform of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,

    pub sources: Vec<SourceSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedSpec>,
}

/// Combination constraints for a target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architectures: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_families: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_versions: Option<Vec<String>>,
}

impl Conditions {
    /// Every list that is present must contain the combination's value
    pub fn matches(&self, combination: &Combination) -> bool {
        fn allows(list: &Option<Vec<String>>, value: &str) -> bool {
            list.as_ref().is_none_or(|values| values.iter().any(|v| v == value))
        }

        allows(&self.architectures, &combination.arch)
            && allows(&self.os_families, &combination.os_family)
            && allows(&self.os_versions, &combination.os_version)
    }
}

/// Pulls taken from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub source_file: String,
    pub pulls: Vec<PullSpec>,
}

/// Copy one role from a source file into the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullSpec {
    pub source_key: String,

    /// Role key in the target; defaults to `source_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// Replaces the target-level transform for this pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl PullSpec {
    /// Role key this pull writes into the target
    pub fn output_key(&self) -> &str {
        self.target_key.as_deref().unwrap_or(&self.source_key)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Package filter, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field text contains any of the values
    Substring(FieldMatch),
    /// Field text equals any of the values
    Allowlist(FieldMatch),
    /// Like `allowlist`, but array fields match on any element
    FieldIn(FieldMatch),
    /// Any nested filter matches
    AnyOf(AnyOf),
}

/// Nested filters of an `any_of` filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnyOf {
    #[serde(default)]
    pub filters: Vec<Filter>,
}

/// Field/values pair shared by the field-matching filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMatch {
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

impl FieldMatch {
    pub fn new<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

fn default_field() -> String {
    PACKAGE_FIELD.to_string()
}

// ============================================================================
// Transforms
// ============================================================================

/// Field-level rewrite applied after filtering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transform {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_fields: Vec<String>,

    /// Old name → new name, applied in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty", with = "ordered_renames")]
    pub rename_fields: Vec<(String, String)>,
}

mod ordered_renames {
    use super::*;

    pub fn serialize<S: Serializer>(
        pairs: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(pairs.len()))?;
        for (old, new) in pairs {
            map.serialize_entry(old, new)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        struct RenameVisitor;

        impl<'de> Visitor<'de> for RenameVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of old field name to new field name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((old, new)) = map.next_entry::<String, String>()? {
                    pairs.push((old, new));
                }
                Ok(pairs)
            }
        }

        deserializer.deserialize_map(RenameVisitor)
    }
}

// ============================================================================
// Derived roles
// ============================================================================

/// A role computed from roles already in the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedSpec {
    pub target_key: String,
    pub operation: DerivedOperation,
}

/// Derived-role operation, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DerivedOperation {
    ExtractCommon(ExtractCommon),
}

/// Collect packages shared by several roles into one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractCommon {
    /// Target role keys to compare (post-rename)
    pub from_keys: Vec<String>,

    /// Number of roles a package must appear in to be common
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: usize,

    /// Remove common packages from the compared roles
    #[serde(default = "default_remove_from_sources")]
    pub remove_from_sources: bool,

    #[serde(default)]
    pub identity: PackageIdentity,
}

fn default_min_occurrences() -> usize {
    2
}

fn default_remove_from_sources() -> bool {
    true
}

/// What makes two packages "the same" when extracting common packages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PackageIdentity {
    /// The `package` field value
    #[default]
    Package,
    /// Every field except `architecture`
    Definition,
}
