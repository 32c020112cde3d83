//! In-memory cluster shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use serde_json::{json, Value};

use kubedeploy_apply::{
    ApiDiscovery, ClusterError, ConfigMapClient, DiscoverySnapshot, ResourceClient,
};
use kubedeploy_core::{GroupVersionKind, ResourceObject, RestMapping, Scope};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Create {
        kind: String,
        namespace: Option<String>,
        name: String,
    },
    Update {
        kind: String,
        namespace: Option<String>,
        name: String,
        resource_version: Option<String>,
    },
}

impl Call {
    pub fn name(&self) -> &str {
        match self {
            Call::Get { name, .. } | Call::Create { name, .. } | Call::Update { name, .. } => name,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Get { .. })
    }
}

type Key = (String, Option<String>, String);

#[derive(Default)]
struct State {
    objects: HashMap<Key, ResourceObject>,
    calls: Vec<Call>,
    version: u64,
    fail_get: HashSet<String>,
    fail_create: HashSet<String>,
    fail_update: HashSet<String>,
    get_delay: HashMap<String, Duration>,
    create_delay: HashMap<String, Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

pub struct FakeCluster {
    snapshot: DiscoverySnapshot,
    state: Mutex<State>,
}

fn mapping(api_version: &str, kind: &str, plural: &str, scope: Scope) -> RestMapping {
    RestMapping {
        gvk: GroupVersionKind::from_api_version(api_version, kind),
        plural: plural.to_string(),
        scope,
    }
}

impl FakeCluster {
    /// A cluster serving Namespace and ClusterRole (cluster-scoped) plus
    /// Service, ConfigMap and Deployment (namespaced).
    pub fn new() -> Self {
        Self {
            snapshot: DiscoverySnapshot {
                resources: vec![
                    mapping("v1", "Namespace", "namespaces", Scope::Cluster),
                    mapping(
                        "rbac.authorization.k8s.io/v1",
                        "ClusterRole",
                        "clusterroles",
                        Scope::Cluster,
                    ),
                    mapping("v1", "Service", "services", Scope::Namespaced),
                    mapping("v1", "ConfigMap", "configmaps", Scope::Namespaced),
                    mapping("apps/v1", "Deployment", "deployments", Scope::Namespaced),
                ],
            },
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake cluster lock")
    }

    /// Store `obj` as if it had been created earlier; returns its version.
    pub fn seed(&self, obj: ResourceObject) -> String {
        let mut state = self.lock();
        state.version += 1;
        let version = state.version.to_string();
        let mut obj = obj;
        obj.set_resource_version(&version);
        let key = (
            obj.kind().to_string(),
            obj.namespace().map(str::to_string),
            obj.name().to_string(),
        );
        state.objects.insert(key, obj);
        version
    }

    /// Store `obj` as-is, without assigning a resourceVersion.
    pub fn seed_unversioned(&self, obj: ResourceObject) {
        let key = (
            obj.kind().to_string(),
            obj.namespace().map(str::to_string),
            obj.name().to_string(),
        );
        self.lock().objects.insert(key, obj);
    }

    pub fn fail_get(&self, name: &str) {
        self.lock().fail_get.insert(name.to_string());
    }

    pub fn fail_create(&self, name: &str) {
        self.lock().fail_create.insert(name.to_string());
    }

    pub fn fail_update(&self, name: &str) {
        self.lock().fail_update.insert(name.to_string());
    }

    pub fn delay_get(&self, name: &str, delay: Duration) {
        self.lock().get_delay.insert(name.to_string(), delay);
    }

    pub fn delay_create(&self, name: &str, delay: Duration) {
        self.lock().create_delay.insert(name.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn object(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<ResourceObject> {
        let key = (
            kind.to_string(),
            namespace.map(str::to_string),
            name.to_string(),
        );
        self.lock().objects.get(&key).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        let obj = self.object("ConfigMap", Some(namespace), name)?;
        serde_json::from_value(obj.into_value()).ok()
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn do_get(&self, kind: &str, namespace: Option<&str>, name: &str) -> Result<ResourceObject, ClusterError> {
        self.record(Call::Get {
            kind: kind.to_string(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        });
        let state = self.lock();
        if state.fail_get.contains(name) {
            return Err(ClusterError::Rejected("injected get failure".into()));
        }
        let key = (kind.to_string(), namespace.map(str::to_string), name.to_string());
        state.objects.get(&key).cloned().ok_or(ClusterError::NotFound)
    }

    fn do_create(&self, namespace: Option<&str>, obj: &ResourceObject) -> Result<ResourceObject, ClusterError> {
        let (kind, name) = (obj.kind().to_string(), obj.name().to_string());
        self.record(Call::Create {
            kind: kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.clone(),
        });
        let mut state = self.lock();
        if state.fail_create.contains(&name) {
            return Err(ClusterError::Rejected("injected create failure".into()));
        }
        let key = (kind, namespace.map(str::to_string), name);
        if state.objects.contains_key(&key) {
            return Err(ClusterError::Rejected("already exists".into()));
        }
        state.version += 1;
        let mut stored = obj.clone();
        stored.set_resource_version(&state.version.to_string());
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    fn do_update(&self, namespace: Option<&str>, obj: &ResourceObject) -> Result<ResourceObject, ClusterError> {
        let (kind, name) = (obj.kind().to_string(), obj.name().to_string());
        self.record(Call::Update {
            kind: kind.clone(),
            namespace: namespace.map(str::to_string),
            name: name.clone(),
            resource_version: obj.resource_version().map(str::to_string),
        });
        let mut state = self.lock();
        if state.fail_update.contains(&name) {
            return Err(ClusterError::Rejected("injected update failure".into()));
        }
        let key = (kind, namespace.map(str::to_string), name);
        let current = state
            .objects
            .get(&key)
            .map(|o| o.resource_version().map(str::to_string))
            .ok_or(ClusterError::NotFound)?;
        if obj.resource_version() != current.as_deref() {
            return Err(ClusterError::Rejected("conflict: stale resourceVersion".into()));
        }
        state.version += 1;
        let mut stored = obj.clone();
        stored.set_resource_version(&state.version.to_string());
        state.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn pause(&self, delays: fn(&State) -> &HashMap<String, Duration>, name: &str) {
        let delay = delays(&self.lock()).get(name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn enter(&self) {
        let mut state = self.lock();
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }

    fn leave(&self) {
        self.lock().in_flight -= 1;
    }
}

#[async_trait]
impl ApiDiscovery for FakeCluster {
    async fn discover(&self) -> Result<DiscoverySnapshot, ClusterError> {
        Ok(self.snapshot.clone())
    }
}

#[async_trait]
impl ResourceClient for FakeCluster {
    async fn get(
        &self,
        mapping: &RestMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClusterError> {
        self.pause(|s| &s.get_delay, name).await;
        self.do_get(&mapping.gvk.kind, namespace, name)
    }

    async fn create(
        &self,
        _mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError> {
        self.enter();
        self.pause(|s| &s.create_delay, obj.name()).await;
        let result = self.do_create(namespace, obj);
        self.leave();
        result
    }

    async fn update(
        &self,
        _mapping: &RestMapping,
        namespace: Option<&str>,
        obj: &ResourceObject,
    ) -> Result<ResourceObject, ClusterError> {
        self.do_update(namespace, obj)
    }
}

fn cm_to_object(cm: &ConfigMap) -> Result<ResourceObject, ClusterError> {
    let mut value = serde_json::to_value(cm)?;
    if let Value::Object(map) = &mut value {
        map.insert("apiVersion".into(), json!("v1"));
        map.insert("kind".into(), json!("ConfigMap"));
    }
    Ok(ResourceObject::new(value))
}

fn object_to_cm(obj: ResourceObject) -> Result<ConfigMap, ClusterError> {
    Ok(serde_json::from_value(obj.into_value())?)
}

#[async_trait]
impl ConfigMapClient for FakeCluster {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap, ClusterError> {
        object_to_cm(self.do_get("ConfigMap", Some(namespace), name)?)
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let obj = cm_to_object(cm)?;
        let namespace = cm.metadata.namespace.clone();
        object_to_cm(self.do_create(namespace.as_deref(), &obj)?)
    }

    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, ClusterError> {
        let obj = cm_to_object(cm)?;
        let namespace = cm.metadata.namespace.clone();
        object_to_cm(self.do_update(namespace.as_deref(), &obj)?)
    }
}

// ---------------------------------------------------------------------------
// Object builders
// ---------------------------------------------------------------------------

pub fn deployment(name: &str) -> ResourceObject {
    ResourceObject::new(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name },
        "spec": { "replicas": 1 }
    }))
}

pub fn service(name: &str, namespace: &str) -> ResourceObject {
    ResourceObject::new(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": name, "namespace": namespace },
        "spec": { "ports": [{ "port": 80 }] }
    }))
}

pub fn namespace(name: &str) -> ResourceObject {
    ResourceObject::new(json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name }
    }))
}
