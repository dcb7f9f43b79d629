//! Error types for the registry crate.

use std::path::PathBuf;

use miette::Diagnostic;
use modreg_utils::error::{FileSystemError, HashError};
use thiserror::Error;

/// Errors that can occur while reading, refreshing or resolving against a
/// registry.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(modreg_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("Invalid JSON in `{}`: {source}", .path.display())]
    #[diagnostic(
        code(modreg_registry::json),
        help("The document may be corrupted or in an invalid format")
    )]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("`{}` is missing", .path.display())]
    #[diagnostic(
        code(modreg_registry::not_a_registry),
        help("Make sure the directory is a Bazel registry")
    )]
    MissingRegistryFile { path: PathBuf },

    #[error("Module `{module}` has no metadata at `{}`", .path.display())]
    #[diagnostic(code(modreg_registry::module_not_found))]
    ModuleNotFound { module: String, path: PathBuf },

    #[error(
        "Failed to compute integrity for {} file(s) in `{}`: {}",
        .failures.len(),
        .dir.display(),
        failed_paths(.failures)
    )]
    #[diagnostic(
        code(modreg_registry::integrity_refresh),
        help("source.json was left unchanged")
    )]
    IntegrityRefresh {
        dir: PathBuf,
        #[related]
        failures: Vec<HashError>,
    },

    #[error(
        "Failed to refresh {} version(s) of `{module}`: {}",
        .failures.len(),
        .versions.join(", ")
    )]
    #[diagnostic(
        code(modreg_registry::module_refresh),
        help("Other versions were refreshed; fix the listed ones and run again")
    )]
    ModuleRefresh {
        module: String,
        versions: Vec<String>,
        #[related]
        failures: Vec<RegistryError>,
    },

    #[error("No version of `{module}` found in: {}", .registries.join(", "))]
    #[diagnostic(
        code(modreg_registry::version_not_found),
        help("Check the module name and the --registry entries in your .bazelrc files")
    )]
    VersionNotFound {
        module: String,
        registries: Vec<String>,
    },

    #[error("Registry lookup task failed: {0}")]
    #[diagnostic(code(modreg_registry::task))]
    TaskFailed(String),
}

fn failed_paths(failures: &[HashError]) -> String {
    failures
        .iter()
        .map(|failure| {
            match failure {
                HashError::ReadFailed { path, .. } => path.display().to_string(),
                other => other.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
