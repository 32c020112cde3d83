//! Template files → [`ResourceSet`].

use std::path::Path;

use kubedeploy_core::{ResourceGroup, ResourceSet};

use crate::engine;
use crate::error::RenderError;
use crate::overlay::EnvOverlay;
use crate::parser;

/// Extensions treated as manifests. Anything else is skipped with a warning.
pub const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MANIFEST_EXTENSIONS.contains(&e))
}

/// Read, render and parse each template, producing one group per file in
/// the given order.
///
/// Fails on the first unreadable, unrenderable or unparsable file.
pub fn load_resource_set<P: AsRef<Path>>(
    paths: &[P],
    overlay: &EnvOverlay,
) -> Result<ResourceSet, RenderError> {
    let mut groups = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        if !is_manifest(path) {
            tracing::warn!("Ignore file ({}), not a yaml, yml or json file", path.display());
            continue;
        }

        let template = std::fs::read_to_string(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rendered = engine::render(path, &template, overlay)?;
        let objects = parser::parse_all(path, rendered.as_bytes())?;
        tracing::debug!(file = %path.display(), objects = objects.len(), "parsed template");

        groups.push(ResourceGroup {
            source: path.to_path_buf(),
            objects,
        });
    }
    Ok(ResourceSet { groups })
}
