//! Environment overlay — the lookup table behind the `env` template binding.

use std::collections::BTreeMap;

use serde::Serialize;

/// Variables carrying this prefix are additionally bound under their
/// lower-cased remainder, so `PLUGIN_IMAGE_TAG` is reachable as `image_tag`.
pub const PLUGIN_PREFIX: &str = "PLUGIN_";

/// String-to-string table consumed by the template renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvOverlay(BTreeMap<String, String>);

impl EnvOverlay {
    /// Build an overlay from `(name, value)` pairs.
    ///
    /// Every variable is bound under its original name; `PLUGIN_`-prefixed
    /// variables are also bound under their stripped, lower-cased name. When
    /// two variables land on the same key the later one wins.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in vars {
            let (key, value) = (key.into(), value.into());
            if let Some(rest) = key.strip_prefix(PLUGIN_PREFIX) {
                map.insert(rest.to_lowercase(), value.clone());
            }
            map.insert(key, value);
        }
        tracing::debug!(entries = map.len(), "built environment overlay");
        Self(map)
    }

    /// Overlay of the current process environment. Non-UTF-8 entries are
    /// converted lossily.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars_os().map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        }))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}
