//! Error types for kubedeploy-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while turning template files into resource objects.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Template failed to parse or execute.
    #[error("render template file({file}) failed: {source}")]
    Template {
        file: PathBuf,
        #[source]
        source: tera::Error,
    },

    /// Rendered output did not decode into resource objects.
    #[error("parse template file({file}) failed: {source}")]
    Parse {
        file: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// Filesystem error while reading a template.
    #[error("read template file({path}) failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single document in a manifest stream was rejected.
///
/// `index` is the zero-based position of the document in the stream.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document {index}: decode failed: {source}")]
    Decode {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document {index}: expected a mapping at the top level")]
    NotAMapping { index: usize },

    #[error("document {index}: missing or empty {field}")]
    MissingField { index: usize, field: &'static str },
}
