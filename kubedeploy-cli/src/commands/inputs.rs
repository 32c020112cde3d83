//! Flags shared by every subcommand that reads templates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use kubedeploy_core::{config, PluginConfig};

/// Input selection. Each list flag, when given at least once, replaces the
/// value from the config file and environment.
#[derive(Args, Debug, Default)]
pub struct InputArgs {
    /// Config file (default: ~/.kubedeploy/config.yaml).
    #[arg(short, long, value_name = "PATH", env = "PLUGIN_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Default namespace for namespaced objects that do not set one.
    #[arg(long)]
    pub namespace: Option<String>,

    /// Template applied before ConfigMaps; repeatable, one group per file.
    #[arg(long = "init-template", value_name = "PATH")]
    pub init_templates: Vec<String>,

    /// Template applied after ConfigMaps; repeatable, one group per file.
    #[arg(long = "template", value_name = "PATH")]
    pub templates: Vec<String>,

    /// `namespace:name:filepath[:filename]`; repeatable.
    #[arg(long = "config-file", value_name = "TOKEN")]
    pub config_files: Vec<String>,

    /// Log at debug level.
    #[arg(long)]
    pub debug: bool,
}

impl InputArgs {
    /// Config file, then `PLUGIN_*` environment, then these flags.
    pub fn resolve(&self) -> Result<PluginConfig> {
        let mut cfg = config::load(self.config.as_deref()).context("failed to load config")?;
        cfg.apply_process_env()
            .context("failed to read PLUGIN_* environment")?;

        if let Some(ns) = &self.namespace {
            cfg.namespace = ns.clone();
        }
        if !self.init_templates.is_empty() {
            cfg.init_templates = self.init_templates.clone();
        }
        if !self.templates.is_empty() {
            cfg.templates = self.templates.clone();
        }
        if !self.config_files.is_empty() {
            cfg.config_files = self.config_files.clone();
        }
        cfg.debug |= self.debug;
        Ok(cfg)
    }
}
