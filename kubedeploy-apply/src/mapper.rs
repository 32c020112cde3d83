//! Kind/version → REST mapping, resolved from one discovery pass.

use std::collections::HashMap;

use thiserror::Error;

use kubedeploy_core::{GroupVersionKind, RestMapping};

/// Every resource kind/version the cluster reported at run start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySnapshot {
    pub resources: Vec<RestMapping>,
}

/// The cluster does not serve the requested kind at the requested version.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no matches for kind \"{kind}\" in version \"{api_version}\"")]
pub struct MappingError {
    pub api_version: String,
    pub kind: String,
}

/// Read-only lookup table built once per run and shared between apply tasks.
#[derive(Debug, Clone, Default)]
pub struct ResourceMapper {
    mappings: HashMap<GroupVersionKind, RestMapping>,
}

impl ResourceMapper {
    /// Index a discovery snapshot. If a kind/version appears twice the first
    /// entry is kept.
    pub fn from_snapshot(snapshot: DiscoverySnapshot) -> Self {
        let mut mappings = HashMap::with_capacity(snapshot.resources.len());
        for mapping in snapshot.resources {
            mappings.entry(mapping.gvk.clone()).or_insert(mapping);
        }
        Self { mappings }
    }

    pub fn resolve(&self, gvk: &GroupVersionKind) -> Result<&RestMapping, MappingError> {
        self.mappings.get(gvk).ok_or_else(|| MappingError {
            api_version: gvk.api_version(),
            kind: gvk.kind.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
