//! # kubedeploy-apply
//!
//! Create-or-update reconciliation of rendered manifests against a cluster.
//!
//! Call [`pipeline::run`] with an [`ApplyPlan`] to apply init templates,
//! ConfigMaps and main templates in that order. [`Reconciler`] and
//! [`ConfigMapAggregate`] can be driven directly for finer control.

pub mod cluster;
pub mod configmap;
pub mod error;
pub mod kube_client;
pub mod mapper;
pub mod pipeline;
pub mod preserve;
pub mod reconciler;

pub use cluster::{ApiDiscovery, ClusterError, ConfigMapClient, ResourceClient};
pub use configmap::ConfigMapAggregate;
pub use error::ApplyError;
pub use kube_client::KubeCluster;
pub use mapper::{DiscoverySnapshot, MappingError, ResourceMapper};
pub use pipeline::{run, ApplyPlan, RunSummary};
pub use preserve::preserve_server_fields;
pub use reconciler::{apply_object, Action, ApplyOptions, ApplyOutcome, Reconciler};
