//! Error types for modreg-core.

use miette::Diagnostic;
use modreg_archive::{ArchiveError, TarError};
use modreg_registry::RegistryError;
use modreg_utils::error::FileSystemError;
use thiserror::Error;

/// Malformed `MODULE.bazel` content.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Expected a `module(...)` call first{}", found_suffix(.found))]
    #[diagnostic(code(modreg::manifest::missing_module))]
    MissingModule { found: Option<String> },

    #[error("`module(...)` has no `name`")]
    #[diagnostic(
        code(modreg::manifest::missing_name),
        help("Add name = \"<module name>\" to the module call")
    )]
    MissingName,

    #[error("`{attr}` must be a string literal, found `{value}`")]
    #[diagnostic(code(modreg::manifest::invalid_string))]
    InvalidString { attr: &'static str, value: String },

    #[error("`{attr}` must be a non-negative decimal integer, found `{value}`")]
    #[diagnostic(code(modreg::manifest::invalid_integer))]
    InvalidInteger { attr: &'static str, value: String },

    #[error("Unclosed `{name}(` call on line {line}")]
    #[diagnostic(code(modreg::manifest::unclosed_call))]
    UnclosedCall { name: String, line: usize },
}

fn found_suffix(found: &Option<String>) -> String {
    match found {
        Some(name) => format!(", found `{name}(...)`"),
        None => String::new(),
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Failed to parse {document}: {source}")]
    #[diagnostic(code(modreg::manifest))]
    Manifest {
        document: String,
        #[source]
        #[diagnostic_source]
        source: ManifestError,
    },

    #[error("{path} not found in archive")]
    #[diagnostic(
        code(modreg::manifest_not_found),
        help("Check the strip prefix; it must match the archive's top-level directory")
    )]
    ManifestNotFound { path: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("Invalid archive URL `{url}`: {reason}")]
    #[diagnostic(
        code(modreg::invalid_archive_url),
        help("Archive URLs must start with https://, http:// or file://")
    )]
    InvalidArchiveUrl { url: String, reason: String },

    #[error("Archive `{file}` is not supported")]
    #[diagnostic(
        code(modreg::unsupported_archive),
        help("Only .tar.gz and .tgz archives are supported")
    )]
    UnsupportedArchive { file: String },

    #[error("Failed to download {url}")]
    #[diagnostic(code(modreg::download))]
    DownloadFailed { url: String },

    #[error("{document} does not declare a version")]
    #[diagnostic(
        code(modreg::missing_version),
        help("Registries need an explicit version = \"...\" in the module call")
    )]
    MissingVersion { document: String },

    #[error("Invalid {what} `{value}`")]
    #[diagnostic(
        code(modreg::invalid_path_component),
        help("Module names and versions become directory names and cannot contain path separators")
    )]
    InvalidPathComponent { what: &'static str, value: String },

    #[error("{module}@{version} already exists")]
    #[diagnostic(code(modreg::version_exists))]
    VersionExists { module: String, version: String },
}

impl From<TarError> for CoreError {
    fn from(err: TarError) -> Self {
        Self::Archive(err.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
