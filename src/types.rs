//! Core data types for the catalog adapter
//!
//! Packages are free-form JSON objects. Roles group packages under a name,
//! source documents hold the roles of one input file, and a target object
//! accumulates the roles written to one output file.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Package field used as the default identity
pub const PACKAGE_FIELD: &str = "package";

/// Field ignored when comparing full package definitions
pub const ARCHITECTURE_FIELD: &str = "architecture";

/// Key holding a role's package list in target files
pub const TARGET_CLUSTER_KEY: &str = "cluster";

// ============================================================================
// Combination
// ============================================================================

/// One (architecture, OS family, OS version) triple found under the input directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination {
    pub arch: String,
    pub os_family: String,
    pub os_version: String,
}

impl Combination {
    pub fn new(
        arch: impl Into<String>,
        os_family: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            arch: arch.into(),
            os_family: os_family.into(),
            os_version: os_version.into(),
        }
    }

    /// Relative directory `<arch>/<os_family>/<os_version>`
    pub fn relative_dir(&self) -> PathBuf {
        [&self.arch, &self.os_family, &self.os_version]
            .into_iter()
            .collect()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.arch, self.os_family, self.os_version)
    }
}

// ============================================================================
// Package
// ============================================================================

/// A single package entry. Field order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Package(Map<String, Value>);

impl Package {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The `package` field, when it is a string
    pub fn name(&self) -> Option<&str> {
        self.0.get(PACKAGE_FIELD).and_then(Value::as_str)
    }

    /// Text form of a field for matching. `None` when missing or null.
    pub fn field_text(&self, field: &str) -> Option<Cow<'_, str>> {
        self.0.get(field).and_then(value_text)
    }

    /// Canonical text of the whole definition except `architecture`.
    ///
    /// Keys are sorted at every nesting level so two packages with the same
    /// fields in a different order produce the same key.
    pub fn definition_key(&self) -> String {
        let canonical: BTreeMap<&str, Value> = self
            .0
            .iter()
            .filter(|(k, _)| k.as_str() != ARCHITECTURE_FIELD)
            .map(|(k, v)| (k.as_str(), canonicalize(v)))
            .collect();
        // A map of JSON values always serializes.
        serde_json::to_string(&canonical).unwrap_or_default()
    }
}

impl FromIterator<(String, Value)> for Package {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Value> for Package {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

/// Coerce a JSON value to the text used by filters
pub fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

// ============================================================================
// Source documents
// ============================================================================

/// A role as it appears in a source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRole {
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// All roles of one source file for one combination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceDocument(BTreeMap<String, SourceRole>);

impl SourceDocument {
    /// Packages of a role, if the role exists
    pub fn role(&self, key: &str) -> Option<&[Package]> {
        self.0.get(key).map(|role| role.packages.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<Package>)> for SourceDocument {
    fn from_iter<I: IntoIterator<Item = (String, Vec<Package>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, packages)| (name, SourceRole { packages }))
                .collect(),
        )
    }
}

// ============================================================================
// Target object
// ============================================================================

/// Roles assembled for one target file, in first-insertion order.
///
/// Replacing an existing role keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetObject {
    roles: Vec<(String, Vec<Package>)>,
}

impl TargetObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role
    pub fn insert(&mut self, key: impl Into<String>, packages: Vec<Package>) {
        let key = key.into();
        match self.roles.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = packages,
            None => self.roles.push((key, packages)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[Package]> {
        self.roles
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, packages)| packages.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keep only the packages of `key` for which `keep` returns true
    pub fn retain_in<F>(&mut self, key: &str, keep: F)
    where
        F: FnMut(&Package) -> bool,
    {
        if let Some((_, packages)) = self.roles.iter_mut().find(|(k, _)| k == key) {
            packages.retain(keep);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Package])> {
        self.roles.iter().map(|(k, p)| (k.as_str(), p.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Serializes as `{role: {"cluster": [package, ...]}}`
impl Serialize for TargetObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Cluster<'a> {
            cluster: &'a [Package],
        }

        let mut map = serializer.serialize_map(Some(self.roles.len()))?;
        for (key, packages) in &self.roles {
            map.serialize_entry(key, &Cluster { cluster: packages })?;
        }
        map.end()
    }
}
