//! [`kube::Client`]-backed implementation of the cluster traits.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ApiResource, DynamicObject, PostParams};
use kube::discovery::{self, ApiGroup, Scope as ApiScope};
use kube::Client;

use kubedeploy_core::{GroupVersionKind, ResourceObject, RestMapping, Scope};

use crate::cluster::{ApiDiscovery, ClusterError, ConfigMapClient, ResourceClient};
use crate::mapper::DiscoverySnapshot;

/// A live cluster reached through `kube`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, mapping: &RestMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = api_resource(mapping);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn api_resource(mapping: &RestMapping) -> ApiResource {
    let gvk = &mapping.gvk;
    ApiResource {
        group: gvk.group.clone(),
        version: gvk.version.clone(),
        api_version: gvk.api_version(),
        kind: gvk.kind.clone(),
        plural: mapping.plural.clone(),
    }
}

fn to_dynamic(obj: &ResourceObject) -> Result<DynamicObject, ClusterError> {
    Ok(serde_json::from_value(obj.as_value().clone())?)
}

fn from_dynamic(obj: &DynamicObject) -> Result<ResourceObject, ClusterError> {
    Ok(ResourceObject::new(serde_json::to_value(obj)?))
}

fn config_map_key(cm: &ConfigMap) -> Result<(&str, &str), ClusterError> {
    match (cm.metadata.namespace.as_deref(), cm.metadata.name.as_deref()) {
        (Some(ns), Some(name)) => Ok((ns, name)),
        _ => Err(ClusterError::Rejected(
            "ConfigMap without namespace or name".to_string(),
        )),
    }
}

/// Every served kind/version of one API group.
fn group_mappings(group: &ApiGroup) -> Vec<RestMapping> {
    let mut mappings = Vec::new();
    for version in group.versions() {
        for (ar, caps) in group.versioned_resources(version) {
            let scope = match caps.scope {
                ApiScope::Namespaced => Scope::Namespaced,
                ApiScope::Cluster => Scope::Cluster,
            };
            mappings.push(RestMapping {
                gvk: GroupVersionKind {
                    group: ar.group,
                    version: ar.version,
                    kind: ar.kind,
                },
                plural: ar.plural,
                scope,
            });
        }
    }
    mappings
}

/// Keep the mappings of every named group that answered; groups that failed
/// are logged and left out.
fn merge_groups<I>(results: I) -> Vec<RestMapping>
where
    I: IntoIterator<Item = (String, Result<Vec<RestMapping>, ClusterError>)>,
{
    let mut resources = Vec::new();
    for (name, result) in results {
        match result {
            Ok(mappings) => resources.extend(mappings),
            Err(e) => tracing::warn!(group = %name, error = %e, "skipping API group, discovery failed"),
        }
    }
    resources
}

#[async_trait]
impl ApiDiscovery for KubeCluster {
    /// The core group must answer. Any other group (typically an aggregated
    /// API whose backend is down) is skipped when its query fails.
    async fn discover(&self) -> Result<DiscoverySnapshot, ClusterError> {
        let core = discovery::group(&self.client, ApiGroup::CORE_GROUP).await?;
        let mut resources = group_mappings(&core);

        let list = self.client.list_api_groups().await?;
        let mut queried = Vec::with_capacity(list.groups.len());
        for g in list.groups {
            let result = discovery::group(&self.client, &g.name)
                .await
                .map(|group| group_mappings(&group))
                .map_err(ClusterError::from);
            queried.push((g.name, result));
        }
        resources.extend(merge_groups(queried));

        tracing::debug!(resources = resources.len(), "discovered API resources");
        Ok(DiscoverySnapshot { resources })
    }
}

#[async_trait]
impl ResourceClient for KubeCluster {
    async fn get(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClusterError> {
        let live = self.dynamic_api(mapping, namespace).get(name).await?;
        from_dynamic(&live)
    }

    async fn create(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError> {
        let created = self
            .dynamic_api(mapping, namespace)
            .create(&PostParams::default(), &to_dynamic(obj)?)
            .await?;
        from_dynamic(&created)
    }

    async fn update(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError> {
        let replaced = self
            .dynamic_api(mapping, namespace)
            .replace(obj.name(), &PostParams::default(), &to_dynamic(obj)?)
            .await?;
        from_dynamic(&replaced)
    }
}

#[async_trait]
impl ConfigMapClient for KubeCluster {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClusterError> {
        Ok(self.config_maps(namespace).get(name).await?)
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let (namespace, _) = config_map_key(cm)?;
        Ok(self
            .config_maps(namespace)
            .create(&PostParams::default(), cm)
            .await?)
    }

    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let (namespace, name) = config_map_key(cm)?;
        Ok(self
            .config_maps(namespace)
            .replace(name, &PostParams::default(), cm)
            .await?)
    }
}
