//! Plugin configuration: YAML file, `PLUGIN_*` environment binding, validation.
//!
//! # Sources (later wins)
//!
//! ```text
//! ~/.kubedeploy/config.yaml   (or an explicit --config path)
//! PLUGIN_* environment        (Drone passes plugin settings this way)
//! command-line flags          (applied by the CLI)
//! ```
//!
//! # API pattern
//!
//! As elsewhere in this crate, functions touching the home directory come in
//! two forms: `fn_at(home: &Path, …)` for tests, and `fn(…)` which derives
//! home from `dirs::home_dir()` and delegates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::types::ConfigFileRef;

/// Prefix shared by every environment variable the plugin reads.
pub const ENV_PREFIX: &str = "PLUGIN_";

/// Connection settings for the target cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// API server URL. Empty means "use the ambient kubeconfig / in-cluster config".
    pub server: String,
    /// Base64-encoded bearer token.
    pub token: String,
    /// PEM-encoded CA certificate.
    pub ca_crt: String,
    pub skip_tls: bool,
}

/// Everything the apply run needs besides the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub kubernetes: KubernetesConfig,
    /// Templates applied first, one group per file.
    pub init_templates: Vec<String>,
    /// `namespace:name:filepath[:filename]` tokens aggregated into ConfigMaps.
    pub config_files: Vec<String>,
    /// Main templates, applied after the ConfigMaps.
    pub templates: Vec<String>,
    /// Default namespace for namespaced objects that do not set one.
    pub namespace: String,
    pub debug: bool,
    /// Upper bound on concurrent applies inside one group. `None` = one task per object.
    pub max_concurrency: Option<usize>,
    /// Cancel in-flight siblings once an apply in the same group fails.
    pub cancel_on_error: bool,
}

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// `<home>/.kubedeploy/config.yaml` — pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(".kubedeploy").join("config.yaml")
}

/// Load configuration from `explicit`, or from the default path under `home`.
///
/// A missing default file yields [`PluginConfig::default`]; a missing explicit
/// file is an error.
pub fn load_at(home: &Path, explicit: Option<&Path>) -> Result<PluginConfig, ConfigError> {
    match explicit {
        Some(path) => read_file(path),
        None => {
            let path = default_path_at(home);
            if !path.exists() {
                return Ok(PluginConfig::default());
            }
            read_file(&path)
        }
    }
}

/// `load_at` convenience wrapper.
///
/// Home is only required when no explicit path is given.
pub fn load(explicit: Option<&Path>) -> Result<PluginConfig, ConfigError> {
    match explicit {
        Some(path) => read_file(path),
        None => load_at(&dirs::home_dir().ok_or(ConfigError::HomeNotFound)?, None),
    }
}

fn read_file(path: &Path) -> Result<PluginConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(PluginConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// 2. Environment binding
// ---------------------------------------------------------------------------

impl PluginConfig {
    /// Override fields from `PLUGIN_*` variables.
    ///
    /// List settings are comma-separated; blank entries are dropped.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(setting) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match setting {
                "DEBUG" => self.debug = parse_bool(key, value)?,
                "NAMESPACE" => self.namespace = value.to_string(),
                "INIT_TEMPLATES" => self.init_templates = split_list(value),
                "TEMPLATES" => self.templates = split_list(value),
                "CONFIG_FILES" => self.config_files = split_list(value),
                "K8S_SERVER" => self.kubernetes.server = value.to_string(),
                "K8S_TOKEN" => self.kubernetes.token = value.to_string(),
                "K8S_CA_CRT" => self.kubernetes.ca_crt = value.to_string(),
                "K8S_SKIP_TLS" => self.kubernetes.skip_tls = parse_bool(key, value)?,
                "MAX_CONCURRENCY" => {
                    self.max_concurrency = match value.trim() {
                        "" | "0" => None,
                        n => Some(n.parse().map_err(|_| invalid_env(key, value))?),
                    }
                }
                "CANCEL_ON_ERROR" => self.cancel_on_error = parse_bool(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// [`apply_env`](Self::apply_env) over the current process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(std::env::vars_os().map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        }))
    }

    // -----------------------------------------------------------------------
    // 3. Validate
    // -----------------------------------------------------------------------

    /// Check inputs and parse the config file tokens.
    ///
    /// Runs before anything touches the cluster, so a bad token or a missing
    /// file fails the whole run with nothing applied.
    pub fn validate(&self) -> Result<Vec<ConfigFileRef>, ValidationError> {
        if self.init_templates.is_empty() && self.config_files.is_empty() && self.templates.is_empty()
        {
            return Err(ValidationError::NoInputs);
        }

        let mut refs = Vec::with_capacity(self.config_files.len());
        for token in &self.config_files {
            let r: ConfigFileRef = token.parse()?;
            if !r.file_path.exists() {
                return Err(ValidationError::MissingFile { path: r.file_path });
            }
            refs.push(r);
        }
        Ok(refs)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(invalid_env(key, value)),
    }
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    }
}
