//! Group-by-group reconciliation of a [`ResourceSet`] against the cluster.
//!
//! # Ordering
//!
//! ```text
//! group 0:  [obj a] [obj b] [obj c]   concurrent, one task each
//!                  ── barrier ──
//! group 1:  [obj d] [obj e]           starts only if group 0 succeeded
//! ```
//!
//! Within a group nothing is ordered. Across groups the order is the
//! configuration order and a failing group stops the run.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use kubedeploy_core::{ResourceGroup, ResourceObject, ResourceSet};

use crate::cluster::{ClusterError, ResourceClient};
use crate::error::ApplyError;
use crate::mapper::ResourceMapper;
use crate::preserve::preserve_server_fields;

/// Knobs for a single apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Upper bound on concurrent applies within one group. `None` runs one
    /// task per object with no cap.
    pub max_concurrency: Option<NonZeroUsize>,
    /// Once an apply fails, stop siblings that have not reached their create
    /// or update call yet. Off by default: siblings run to completion.
    pub cancel_on_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Created => f.write_str("created"),
            Action::Updated => f.write_str("updated"),
        }
    }
}

/// Result of one successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub action: Action,
    pub kind: String,
    /// `None` for cluster-scoped objects.
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{} {}", self.kind, ns, self.name, self.action),
            None => write!(f, "{} {} {}", self.kind, self.name, self.action),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Applies resource sets through a [`ResourceClient`].
///
/// Cheap to share: the client and mapper are reference-counted and cloned
/// into each apply task.
pub struct Reconciler<C: ?Sized> {
    client: Arc<C>,
    mapper: Arc<ResourceMapper>,
    default_namespace: Arc<str>,
    options: ApplyOptions,
}

impl<C> Reconciler<C>
where
    C: ResourceClient + ?Sized + 'static,
{
    pub fn new(
        client: Arc<C>,
        mapper: Arc<ResourceMapper>,
        default_namespace: &str,
        options: ApplyOptions,
    ) -> Self {
        Self {
            client,
            mapper,
            default_namespace: Arc::from(default_namespace),
            options,
        }
    }

    /// Apply every group in order. Returns the outcomes of all groups, or
    /// the first error; groups after a failing one are never started.
    pub async fn apply_set(&self, set: &ResourceSet) -> Result<Vec<ApplyOutcome>, ApplyError> {
        let mut outcomes = Vec::with_capacity(set.object_count());
        for group in &set.groups {
            outcomes.extend(self.apply_group(group).await?);
        }
        Ok(outcomes)
    }

    /// Apply one group concurrently and wait for every task to finish.
    ///
    /// Outcomes are in completion order. When several objects fail, the
    /// error returned is the first one observed.
    pub async fn apply_group(
        &self,
        group: &ResourceGroup,
    ) -> Result<Vec<ApplyOutcome>, ApplyError> {
        if group.objects.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(
            source = %group.source.display(),
            objects = group.objects.len(),
            "applying group"
        );

        let cancel = CancellationToken::new();
        let limit = self
            .options
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.get())));

        let mut tasks = JoinSet::new();
        for obj in group.objects.iter().cloned() {
            let client = Arc::clone(&self.client);
            let mapper = Arc::clone(&self.mapper);
            let namespace = Arc::clone(&self.default_namespace);
            let cancel = cancel.clone();
            let limit = limit.clone();

            tasks.spawn(async move {
                let _permit = match limit {
                    Some(sem) => tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(None),
                        permit = sem.acquire_owned() => permit.ok(),
                    },
                    None => None,
                };
                apply_object(client.as_ref(), &mapper, &namespace, obj, &cancel).await
            });
        }

        let mut outcomes = Vec::with_capacity(group.objects.len());
        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(ApplyError::from).and_then(|r| r) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => {
                    if first_err.is_none() {
                        if self.options.cancel_on_error {
                            cancel.cancel();
                        }
                        first_err = Some(e);
                    }
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }
}

// ---------------------------------------------------------------------------
// Single-object apply
// ---------------------------------------------------------------------------

/// Create `obj` if it does not exist, update it otherwise, and log the
/// outcome.
///
/// Namespaced objects without a namespace are placed in `default_namespace`.
/// Returns `Ok(None)` when `cancel` fired before a create or update was sent.
pub async fn apply_object<C>(
    client: &C,
    mapper: &ResourceMapper,
    default_namespace: &str,
    obj: ResourceObject,
    cancel: &CancellationToken,
) -> Result<Option<ApplyOutcome>, ApplyError>
where
    C: ResourceClient + ?Sized,
{
    let kind = obj.kind().to_string();
    let name = obj.name().to_string();
    let result = reconcile(client, mapper, default_namespace, obj, cancel).await;

    match &result {
        Ok(Some(o)) => tracing::info!(
            kind = %o.kind,
            namespace = o.namespace.as_deref().unwrap_or(""),
            name = %o.name,
            outcome = %o.action,
            "applied"
        ),
        Ok(None) => tracing::info!(kind = %kind, name = %name, outcome = "cancelled", "skipped"),
        Err(e) => tracing::error!(kind = %kind, name = %name, outcome = "failed", error = %e, "apply failed"),
    }
    result
}

/// `Ok(None)` means the token was cancelled before any mutation was sent.
async fn reconcile<C>(
    client: &C,
    mapper: &ResourceMapper,
    default_namespace: &str,
    mut obj: ResourceObject,
    cancel: &CancellationToken,
) -> Result<Option<ApplyOutcome>, ApplyError>
where
    C: ResourceClient + ?Sized,
{
    let mapping = mapper.resolve(&obj.gvk())?;
    let kind = obj.kind().to_string();
    let name = obj.name().to_string();

    let namespace = if mapping.is_namespaced() {
        match obj.namespace() {
            Some(ns) => Some(ns.to_string()),
            None if !default_namespace.is_empty() => {
                obj.set_namespace(default_namespace);
                Some(default_namespace.to_string())
            }
            None => {
                return Err(ApplyError::MissingNamespace {
                    api_version: obj.api_version().to_string(),
                    kind,
                    name,
                })
            }
        }
    } else {
        None
    };
    let ns = namespace.as_deref();

    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        res = client.get(mapping, ns, &name) => res,
    };
    if cancel.is_cancelled() {
        return Ok(None);
    }

    let action = match fetched {
        Ok(live) => {
            preserve_server_fields(&live, &mut obj);
            if let Some(version) = live.resource_version() {
                obj.set_resource_version(version);
            } else {
                obj.remove_path(&["metadata", "resourceVersion"]);
            }
            client
                .update(mapping, ns, &obj)
                .await
                .map_err(|e| ApplyError::update(&kind, &name, e))?;
            Action::Updated
        }
        Err(ClusterError::NotFound) => {
            client
                .create(mapping, ns, &obj)
                .await
                .map_err(|e| ApplyError::create(&kind, &name, e))?;
            Action::Created
        }
        Err(e) => return Err(ApplyError::fetch(&kind, &name, e)),
    };

    Ok(Some(ApplyOutcome {
        action,
        kind,
        namespace,
        name,
    }))
}
