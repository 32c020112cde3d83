//! Error types for kubedeploy-apply.

use std::path::PathBuf;

use thiserror::Error;

use kubedeploy_core::ValidationError;
use kubedeploy_renderer::RenderError;

use crate::cluster::ClusterError;
use crate::mapper::MappingError;

/// All errors that can end an apply run. Every one of them is fatal.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A namespaced object without `metadata.namespace`, and no default
    /// namespace configured.
    #[error("{kind} {name} ({api_version}) is namespaced but no namespace is set and no default namespace is configured")]
    MissingNamespace {
        api_version: String,
        kind: String,
        name: String,
    },

    /// Fetching the live object failed for a reason other than absence.
    #[error("get {kind} {name} failed: {source}")]
    Fetch {
        kind: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("create {kind} {name} failed: {source}")]
    Create {
        kind: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    #[error("update {kind} {name} failed: {source}")]
    Update {
        kind: String,
        name: String,
        #[source]
        source: ClusterError,
    },

    /// The cluster's resource list could not be read.
    #[error("discovery failed: {0}")]
    Discovery(#[source] ClusterError),

    #[error("read config file({path}) failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An apply task panicked.
    #[error("apply task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApplyError {
    pub(crate) fn fetch(kind: &str, name: &str, source: ClusterError) -> Self {
        ApplyError::Fetch {
            kind: kind.to_string(),
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn create(kind: &str, name: &str, source: ClusterError) -> Self {
        ApplyError::Create {
            kind: kind.to_string(),
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn update(kind: &str, name: &str, source: ClusterError) -> Self {
        ApplyError::Update {
            kind: kind.to_string(),
            name: name.to_string(),
            source,
        }
    }
}
