//! Shared apply pipeline entrypoint used by the CLI.
//!
//! ```text
//! ApplyPlan::load   render + parse every template, no cluster access
//! run               discovery → init groups → ConfigMaps → main groups
//! ```

use std::path::Path;
use std::sync::Arc;

use kubedeploy_core::{ConfigFileRef, ResourceSet};
use kubedeploy_renderer::{load_resource_set, EnvOverlay};

use crate::cluster::{ApiDiscovery, ConfigMapClient, ResourceClient};
use crate::configmap::ConfigMapAggregate;
use crate::error::ApplyError;
use crate::mapper::ResourceMapper;
use crate::reconciler::{ApplyOptions, ApplyOutcome, Reconciler};

/// Everything a run applies, rendered up front.
#[derive(Debug, Clone, Default)]
pub struct ApplyPlan {
    pub init: ResourceSet,
    /// Read when the ConfigMap stage starts, after the init groups.
    pub config_files: Vec<ConfigFileRef>,
    pub main: ResourceSet,
    pub namespace: String,
}

impl ApplyPlan {
    /// Render and parse the init and main templates.
    ///
    /// A template that fails here fails the run before the cluster is
    /// contacted.
    pub fn load<P: AsRef<Path>>(
        init_paths: &[P],
        config_files: Vec<ConfigFileRef>,
        main_paths: &[P],
        namespace: &str,
        overlay: &EnvOverlay,
    ) -> Result<Self, ApplyError> {
        let init = load_resource_set(init_paths, overlay)?;
        let main = load_resource_set(main_paths, overlay)?;
        Ok(Self {
            init,
            config_files,
            main,
            namespace: namespace.to_string(),
        })
    }
}

/// Outcomes per stage of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub init: Vec<ApplyOutcome>,
    pub config_maps: Vec<ApplyOutcome>,
    pub main: Vec<ApplyOutcome>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.init.len() + self.config_maps.len() + self.main.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.init
            .iter()
            .chain(&self.config_maps)
            .chain(&self.main)
    }
}

/// Apply `plan` to `cluster`. Stops at the first error; whatever was applied
/// before it stays applied.
pub async fn run<C>(
    cluster: Arc<C>,
    plan: &ApplyPlan,
    options: ApplyOptions,
) -> Result<RunSummary, ApplyError>
where
    C: ApiDiscovery + ResourceClient + ConfigMapClient + 'static,
{
    let snapshot = cluster.discover().await.map_err(ApplyError::Discovery)?;
    let mapper = Arc::new(ResourceMapper::from_snapshot(snapshot));
    let reconciler = Reconciler::new(Arc::clone(&cluster), mapper, &plan.namespace, options);

    let mut summary = RunSummary::default();

    tracing::debug!(objects = plan.init.object_count(), "applying init templates");
    summary.init = reconciler.apply_set(&plan.init).await?;

    if !plan.config_files.is_empty() {
        let aggregate = ConfigMapAggregate::build(&plan.config_files).await?;
        summary.config_maps = aggregate.apply(cluster.as_ref()).await?;
    }

    tracing::debug!(objects = plan.main.object_count(), "applying templates");
    summary.main = reconciler.apply_set(&plan.main).await?;

    tracing::info!(applied = summary.total(), "apply finished");
    Ok(summary)
}
