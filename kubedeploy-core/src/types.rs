//! Domain types shared by the renderer and the apply engine.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Manifest documents are kept as an ordered JSON tree so that fields the
//! engine does not understand survive a round trip to the cluster untouched.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// GroupVersionKind
// ---------------------------------------------------------------------------

/// Type identifier of a manifest document.
///
/// The core API group is represented by an empty `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split an `apiVersion` (`apps/v1` or `v1`) and pair it with `kind`.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        Self {
            group,
            version,
            kind: kind.to_string(),
        }
    }

    /// Reassemble the `apiVersion` string.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

// ---------------------------------------------------------------------------
// ResourceObject
// ---------------------------------------------------------------------------

/// One manifest document as a schema-less, ordered field tree.
///
/// Typed accessors cover the handful of fields the apply engine inspects;
/// everything else is reached through the path helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceObject(Value);

impl ResourceObject {
    /// Wrap a decoded document. Callers are expected to have checked it is a mapping.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    pub fn api_version(&self) -> &str {
        self.str_at(&["apiVersion"]).unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.str_at(&["kind"]).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.str_at(&["metadata", "name"]).unwrap_or_default()
    }

    /// `metadata.namespace`, treating an empty string as unset.
    pub fn namespace(&self) -> Option<&str> {
        self.str_at(&["metadata", "namespace"])
            .filter(|ns| !ns.is_empty())
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        self.set_path(
            &["metadata", "namespace"],
            Value::String(namespace.to_string()),
        );
    }

    /// The concurrency-control version token (`metadata.resourceVersion`).
    pub fn resource_version(&self) -> Option<&str> {
        self.str_at(&["metadata", "resourceVersion"])
    }

    pub fn set_resource_version(&mut self, version: &str) {
        self.set_path(
            &["metadata", "resourceVersion"],
            Value::String(version.to_string()),
        );
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(self.api_version(), self.kind())
    }

    /// Look up a nested field by mapping keys.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.0, |node, key| node.as_object()?.get(*key))
    }

    /// Set a nested field, creating (or replacing non-mapping) intermediate nodes.
    pub fn set_path(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            self.0 = value;
            return;
        };
        let mut node = &mut self.0;
        for key in parents {
            node = ensure_object(node)
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(node).insert((*last).to_string(), value);
    }

    /// Remove a nested field, returning the previous value if there was one.
    pub fn remove_path(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut node = &mut self.0;
        for key in parents {
            node = node.as_object_mut()?.get_mut(*key)?;
        }
        node.as_object_mut()?.remove(*last)
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

impl From<Value> for ResourceObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// ResourceSet
// ---------------------------------------------------------------------------

/// Objects parsed from a single template file.
///
/// A group is the unit of concurrency and of fail-fast: its members are
/// applied together and the next group waits for all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup {
    pub source: PathBuf,
    pub objects: Vec<ResourceObject>,
}

/// Ordered groups, one per template file, in configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    pub groups: Vec<ResourceGroup>,
}

impl ResourceSet {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.objects.is_empty())
    }

    /// Total number of objects across all groups.
    pub fn object_count(&self) -> usize {
        self.groups.iter().map(|g| g.objects.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// RestMapping
// ---------------------------------------------------------------------------

/// Whether a resource lives inside a namespace or at cluster level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// A kind/version pair resolved against the cluster's discovery data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RestMapping {
    pub gvk: GroupVersionKind,
    /// Plural API resource name, e.g. `deployments`.
    pub plural: String,
    pub scope: Scope,
}

impl RestMapping {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }
}

// ---------------------------------------------------------------------------
// ConfigFileRef
// ---------------------------------------------------------------------------

/// One file's contribution to a ConfigMap.
///
/// Written as `namespace:name:filepath` or `namespace:name:filepath:filename`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigFileRef {
    pub namespace: String,
    pub name: String,
    pub file_path: PathBuf,
    pub file_name: Option<String>,
}

impl ConfigFileRef {
    /// The data key used inside the ConfigMap: the override if present,
    /// otherwise the file's base name.
    pub fn data_key(&self) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => base_name(&self.file_path),
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FromStr for ConfigFileRef {
    type Err = ValidationError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = token.split(':').collect();
        let file_name = match parts.len() {
            3 => None,
            4 => Some(parts[3].to_string()),
            _ => {
                return Err(ValidationError::MalformedConfigFileToken {
                    token: token.to_string(),
                })
            }
        };
        Ok(Self {
            namespace: parts[0].to_string(),
            name: parts[1].to_string(),
            file_path: PathBuf::from(parts[2]),
            file_name,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
