//! The slice of the cluster API the apply engine depends on.
//!
//! [`crate::kube_client::KubeCluster`] implements these traits against a real
//! API server; tests substitute an in-memory cluster.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use thiserror::Error;

use kubedeploy_core::{ResourceObject, RestMapping};

use crate::mapper::DiscoverySnapshot;

/// Failure of a single cluster call.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The addressed object does not exist. Selects the create branch; never
    /// fatal on its own.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Kube(kube::Error),

    /// Object could not be converted to or from the wire representation.
    #[error("object conversion failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The server refused the request for a reason other than absence.
    #[error("{0}")]
    Rejected(String),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => ClusterError::NotFound,
            other => ClusterError::Kube(other),
        }
    }
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound)
    }
}

/// Enumerates the resource kinds the cluster serves.
#[async_trait]
pub trait ApiDiscovery: Send + Sync {
    async fn discover(&self) -> Result<DiscoverySnapshot, ClusterError>;
}

/// Generic object access by resource type, optional namespace and name.
///
/// `namespace` is `None` exactly when the mapping is cluster-scoped.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClusterError>;

    async fn create(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError>;

    /// Replace an existing object. `obj` carries the version token of the
    /// most recent read.
    async fn update(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError>;
}

/// Typed ConfigMap access. Namespace and name come from the object metadata
/// on writes.
#[async_trait]
pub trait ConfigMapClient: Send + Sync {
    async fn get_config_map(&self, namespace: &str, name: &str)
        -> Result<ConfigMap, ClusterError>;

    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError>;

    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError>;
}
