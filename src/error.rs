//! Error taxonomy for the shader compilation pipeline.
//!
//! Every stage returns `Result` and short-circuits with `?`; a stage that
//! depends on a prior failed result is simply never called. No panics cross
//! the crate's public boundary.

use std::path::PathBuf;

/// One variant per failure category the pipeline can produce.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// Missing or unknown target platform, source language, or shader stage.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The front-end rejected the shader source. `message` carries the
    /// front-end diagnostic verbatim.
    #[error("compilation failed: {file}: {message}")]
    Compilation { file: String, message: String },

    /// Backend construction or target-language emission failed.
    #[error("cross-compilation failed: {0}")]
    CrossCompilation(String),

    /// Reflection walked into something it cannot describe. Carries every
    /// diagnostic accumulated over the walk, newline-separated.
    #[error("reflection failed: {0}")]
    Reflection(String),

    /// Encoding or decoding a runtime artifact failed.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The bundle config document is malformed. The message names the
    /// offending shader key and field.
    #[error("bundle config error: {0}")]
    BundleConfig(String),

    /// A (shader, backend) pair inside a bundle build failed. `backend` is
    /// `None` when the failure precedes backend selection (e.g. an
    /// unreadable source file).
    #[error("{}", bundle_context(.shader, .backend, .source))]
    Bundle {
        shader: String,
        backend: Option<String>,
        #[source]
        source: Box<CompileError>,
    },

    /// Filesystem failure, annotated with the path involved.
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn bundle_context(shader: &str, backend: &Option<String>, source: &CompileError) -> String {
    match backend {
        Some(backend) => format!("shader '{shader}' (backend {backend}): {source}"),
        None => format!("shader '{shader}': {source}"),
    }
}

impl CompileError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
