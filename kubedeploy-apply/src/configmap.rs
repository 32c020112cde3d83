//! Loose files → ConfigMaps.
//!
//! Every [`ConfigFileRef`] contributes one data entry to the ConfigMap named
//! by its namespace and name. Entries for the same target are merged; the
//! key is the file name override, or the file's base name.

use std::collections::BTreeMap;
use std::io::ErrorKind;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use kubedeploy_core::{ConfigFileRef, ValidationError};

use crate::cluster::{ClusterError, ConfigMapClient};
use crate::error::ApplyError;
use crate::reconciler::{Action, ApplyOutcome};

const KIND: &str = "ConfigMap";

/// `(namespace, name) → (data key → file contents)`, ordered for
/// deterministic apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMapAggregate {
    maps: BTreeMap<(String, String), BTreeMap<String, String>>,
}

impl ConfigMapAggregate {
    /// Read every referenced file. A later ref with the same target and key
    /// replaces the earlier contents.
    pub async fn build(refs: &[ConfigFileRef]) -> Result<Self, ApplyError> {
        let mut agg = Self::default();
        for r in refs {
            let contents = match tokio::fs::read_to_string(&r.file_path).await {
                Ok(c) => c,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(ValidationError::MissingFile {
                        path: r.file_path.clone(),
                    }
                    .into())
                }
                Err(source) => {
                    return Err(ApplyError::Io {
                        path: r.file_path.clone(),
                        source,
                    })
                }
            };
            agg.insert(&r.namespace, &r.name, r.data_key(), contents);
        }
        Ok(agg)
    }

    pub fn insert(
        &mut self,
        namespace: &str,
        name: &str,
        key: impl Into<String>,
        contents: impl Into<String>,
    ) {
        self.maps
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.into(), contents.into());
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&BTreeMap<String, String>> {
        self.maps.get(&(namespace.to_string(), name.to_string()))
    }

    /// Number of distinct ConfigMaps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// The desired ConfigMap objects, in `(namespace, name)` order.
    pub fn to_config_maps(&self) -> Vec<ConfigMap> {
        self.maps
            .iter()
            .map(|((namespace, name), data)| ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(namespace.clone()),
                    ..Default::default()
                },
                data: Some(data.clone()),
                ..Default::default()
            })
            .collect()
    }

    /// Create or update each ConfigMap in turn, stopping at the first error.
    pub async fn apply<C>(&self, client: &C) -> Result<Vec<ApplyOutcome>, ApplyError>
    where
        C: ConfigMapClient + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.maps.len());
        for mut cm in self.to_config_maps() {
            let namespace = cm.metadata.namespace.clone().unwrap_or_default();
            let name = cm.metadata.name.clone().unwrap_or_default();

            let result = apply_one(client, &mut cm, &namespace, &name).await;
            match &result {
                Ok(action) => tracing::info!(
                    kind = KIND,
                    namespace = %namespace,
                    name = %name,
                    outcome = %action,
                    "applied"
                ),
                Err(e) => tracing::error!(
                    kind = KIND,
                    namespace = %namespace,
                    name = %name,
                    outcome = "failed",
                    error = %e,
                    "apply failed"
                ),
            }

            outcomes.push(ApplyOutcome {
                action: result?,
                kind: KIND.to_string(),
                namespace: Some(namespace),
                name,
            });
        }
        Ok(outcomes)
    }
}

async fn apply_one<C>(
    client: &C,
    cm: &mut ConfigMap,
    namespace: &str,
    name: &str,
) -> Result<Action, ApplyError>
where
    C: ConfigMapClient + ?Sized,
{
    match client.get_config_map(namespace, name).await {
        Ok(live) => {
            cm.metadata.resource_version = live.metadata.resource_version;
            client
                .update_config_map(cm)
                .await
                .map_err(|e| ApplyError::update(KIND, name, e))?;
            Ok(Action::Updated)
        }
        Err(ClusterError::NotFound) => {
            client
                .create_config_map(cm)
                .await
                .map_err(|e| ApplyError::create(KIND, name, e))?;
            Ok(Action::Created)
        }
        Err(e) => Err(ApplyError::fetch(KIND, name, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file_ref(token: &str) -> ConfigFileRef {
        token.parse().expect("token")
    }

    #[tokio::test]
    async fn two_refs_to_one_target_give_two_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.conf");
        let b = dir.path().join("b.conf");
        std::fs::write(&a, "alpha").expect("write");
        std::fs::write(&b, "beta").expect("write");

        let refs = vec![
            file_ref(&format!("default:myapp:{}", a.display())),
            file_ref(&format!("default:myapp:{}:renamed.conf", b.display())),
        ];
        let agg = ConfigMapAggregate::build(&refs).await.expect("build");

        assert_eq!(agg.len(), 1);
        let data = agg.get("default", "myapp").expect("myapp");
        assert_eq!(data.get("a.conf").map(String::as_str), Some("alpha"));
        assert_eq!(data.get("renamed.conf").map(String::as_str), Some("beta"));
    }

    #[tokio::test]
    async fn plain_refs_to_one_target_keep_both_file_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.conf");
        let b = dir.path().join("b.conf");
        std::fs::write(&a, "alpha").expect("write");
        std::fs::write(&b, "beta").expect("write");

        let refs = vec![
            file_ref(&format!("ns:name:{}", a.display())),
            file_ref(&format!("ns:name:{}", b.display())),
        ];
        let agg = ConfigMapAggregate::build(&refs).await.expect("build");

        assert_eq!(agg.len(), 1);
        let data = agg.get("ns", "name").expect("ns/name");
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("a.conf").map(String::as_str), Some("alpha"));
        assert_eq!(data.get("b.conf").map(String::as_str), Some("beta"));
    }

    #[tokio::test]
    async fn later_ref_overwrites_same_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("one");
        let second = dir.path().join("two");
        std::fs::write(&first, "old").expect("write");
        std::fs::write(&second, "new").expect("write");

        let refs = vec![
            file_ref(&format!("ns:cm:{}:app.conf", first.display())),
            file_ref(&format!("ns:cm:{}:app.conf", second.display())),
        ];
        let agg = ConfigMapAggregate::build(&refs).await.expect("build");
        assert_eq!(
            agg.get("ns", "cm").and_then(|d| d.get("app.conf")).map(String::as_str),
            Some("new")
        );
    }

    #[tokio::test]
    async fn missing_file_is_a_validation_error() {
        let refs = vec![ConfigFileRef {
            namespace: "default".into(),
            name: "myapp".into(),
            file_path: PathBuf::from("/nonexistent/kubedeploy/a.conf"),
            file_name: None,
        }];
        let err = ConfigMapAggregate::build(&refs).await.unwrap_err();
        assert!(matches!(
            err,
            ApplyError::Validation(ValidationError::MissingFile { .. })
        ));
    }

    #[test]
    fn config_maps_are_ordered_by_target() {
        let mut agg = ConfigMapAggregate::default();
        agg.insert("prod", "web", "k", "v");
        agg.insert("default", "zeta", "k", "v");
        agg.insert("default", "alpha", "k", "v");

        let names: Vec<_> = agg
            .to_config_maps()
            .into_iter()
            .map(|cm| {
                format!(
                    "{}/{}",
                    cm.metadata.namespace.unwrap_or_default(),
                    cm.metadata.name.unwrap_or_default()
                )
            })
            .collect();
        assert_eq!(names, vec!["default/alpha", "default/zeta", "prod/web"]);
    }
}
