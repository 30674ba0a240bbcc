//! Error types emitted by the geoenrich CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use geoenrich_core::ConfigError;
use geoenrich_data::PipelineError;
use thiserror::Error;

/// Errors emitted by the geoenrich CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// The merged settings are out of range.
    #[error("invalid enrichment settings: {0}")]
    InvalidSettings(#[from] ConfigError),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name without dashes.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag naming the input.
        field: &'static str,
        /// Path supplied.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag naming the input.
        field: &'static str,
        /// Path supplied.
        path: Utf8PathBuf,
    },
    /// A path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectPath {
        /// Flag naming the path.
        field: &'static str,
        /// Path supplied.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The output path names a directory.
    #[error("output path {path:?} is a directory")]
    OutputIsDirectory {
        /// Path supplied.
        path: Utf8PathBuf,
    },
    /// The output file could not be created.
    #[error("failed to create output file {path:?}: {source}")]
    CreateOutput {
        /// Path supplied.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The pipeline failed.
    #[error("enrichment failed: {0}")]
    Pipeline(#[source] Box<PipelineError>),
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        Self::Pipeline(Box::new(error))
    }
}
