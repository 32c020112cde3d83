//! Error types for kubedeploy-core.

use std::path::PathBuf;

use thiserror::Error;

/// Input problems detected before anything is applied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// None of init templates, config files and templates is configured.
    #[error("at least one of init_templates, config_files and templates must be defined")]
    NoInputs,

    /// A config file token did not split into 3 or 4 colon-separated fields.
    #[error(
        "config file ({token}) format error, use `namespace:name:filepath` or `namespace:name:filepath:filename`"
    )]
    MalformedConfigFileToken { token: String },

    /// A config file token references a file that does not exist.
    #[error("config file {path} does not exist")]
    MissingFile { path: PathBuf },
}

/// All errors that can arise while loading and validating plugin configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.kubedeploy/`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    /// An environment variable held a value of the wrong shape.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
