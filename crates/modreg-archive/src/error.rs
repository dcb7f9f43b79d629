//! Error types for the archive crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while inflating or reading a source archive.
#[derive(Error, Diagnostic, Debug)]
pub enum ArchiveError {
    #[error("Archive is empty")]
    #[diagnostic(
        code(modreg_archive::empty),
        help("The download may have failed or returned no content")
    )]
    EmptyInput,

    #[error("Failed to decode gzip stream: {source}")]
    #[diagnostic(
        code(modreg_archive::decode),
        help("The archive is corrupt or is not a .tar.gz file")
    )]
    Decode {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tar(#[from] TarError),
}

/// Structural corruption in a tar stream.
///
/// These are never a normal "not found": byte offsets past the failing
/// header can no longer be trusted, so iteration stops at the first one.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TarError {
    #[error("Invalid {field} field in tar header at offset {offset}: {value:?}")]
    #[diagnostic(code(modreg_archive::tar::invalid_number))]
    InvalidNumber {
        field: &'static str,
        offset: usize,
        value: String,
    },

    #[error("Malformed PAX record at offset {offset}: {reason}")]
    #[diagnostic(code(modreg_archive::tar::invalid_pax))]
    InvalidPaxRecord { offset: usize, reason: String },

    #[error("Tar stream truncated at offset {offset}: need {needed} bytes, {available} available")]
    #[diagnostic(
        code(modreg_archive::tar::truncated),
        help("The archive was cut short or its size fields are inconsistent")
    )]
    Truncated {
        offset: usize,
        needed: u64,
        available: usize,
    },
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
