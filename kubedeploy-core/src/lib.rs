//! kubedeploy core library — domain types, plugin configuration, errors.
//!
//! Public API surface:
//! - [`types`] — resource tree, resource sets, REST mappings, config file refs
//! - [`error`] — [`ValidationError`], [`ConfigError`]
//! - [`config`] — load / env binding / validate

pub mod config;
pub mod error;
pub mod types;

pub use config::{KubernetesConfig, PluginConfig};
pub use error::{ConfigError, ValidationError};
pub use types::{
    ConfigFileRef, GroupVersionKind, ResourceGroup, ResourceObject, ResourceSet, RestMapping,
    Scope,
};
