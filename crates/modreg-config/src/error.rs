use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file `{}`: {source}", .path.display())]
    #[diagnostic(
        code(modreg_config::read),
        help("Check the permissions of the file, or remove it")
    )]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot find a workspace containing MODULE.bazel from `{}`", .start.display())]
    #[diagnostic(
        code(modreg_config::workspace_not_found),
        help("Run inside a Bazel module, or create MODULE.bazel at its root")
    )]
    WorkspaceNotFound { start: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
