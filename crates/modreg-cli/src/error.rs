use std::path::PathBuf;

use miette::Diagnostic;
use modreg_config::ConfigError;
use modreg_core::CoreError;
use modreg_dl::DownloadError;
use modreg_registry::RegistryError;
use modreg_utils::error::HashError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hash(#[from] HashError),

    #[error("Nothing found at `{url}`")]
    #[diagnostic(code(modreg::cli::not_found))]
    NotFound { url: String },

    #[error("Failed to read `{}`: {source}", .path.display())]
    #[diagnostic(code(modreg::cli::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to determine the current directory: {0}")]
    #[diagnostic(code(modreg::cli::current_dir))]
    CurrentDir(#[source] std::io::Error),

    #[error("Invalid proxy `{proxy}`: {source}")]
    #[diagnostic(code(modreg::cli::proxy))]
    Proxy {
        proxy: String,
        #[source]
        source: ureq::Error,
    },

    #[error("Invalid header `{header}`")]
    #[diagnostic(
        code(modreg::cli::header),
        help("Headers look like `Name: value`")
    )]
    InvalidHeader { header: String },

    #[error("Failed to serialize output: {0}")]
    #[diagnostic(code(modreg::cli::json))]
    Json(#[source] serde_json::Error),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
