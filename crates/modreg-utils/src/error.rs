use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum HashError {
    #[error("Failed to read file `{}`: {source}", .path.display())]
    #[diagnostic(
        code(modreg_utils::hash::read),
        help("Check that the file exists and is readable")
    )]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid integrity string `{input}`: {reason}")]
    #[diagnostic(
        code(modreg_utils::hash::invalid_integrity),
        help("Integrity strings look like `sha256-<base64 digest>`")
    )]
    InvalidIntegrity { input: String, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{}`: {source}", .path.display())]
    #[diagnostic(code(modreg_utils::fs::file))]
    File {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{}`: {source}", .path.display())]
    #[diagnostic(code(modreg_utils::fs::directory))]
    Directory {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type HashResult<T> = std::result::Result<T, HashError>;

#[cfg(test)]
mod tests {
    use std::{error::Error, io};

    use super::*;

    #[test]
    fn test_hash_error_display_and_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error = HashError::ReadFailed {
            path: PathBuf::from("/test"),
            source: io_error,
        };
        assert_eq!(
            error.to_string(),
            "Failed to read file `/test`: file not found"
        );
        assert!(error.source().is_some());

        let error = HashError::InvalidIntegrity {
            input: "md5-abc".to_string(),
            reason: "unsupported algorithm `md5`".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid integrity string `md5-abc`: unsupported algorithm `md5`"
        );
        assert!(error.source().is_none());
    }

    #[test]
    fn test_file_system_error_display() {
        let file_error = FileSystemError::File {
            path: PathBuf::from("/file"),
            action: "read",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            file_error.to_string(),
            "Failed to read file `/file`: permission denied"
        );

        let dir_error = FileSystemError::Directory {
            path: PathBuf::from("/dir"),
            action: "walk",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            dir_error.to_string(),
            "Failed to walk directory `/dir`: permission denied"
        );
        assert!(dir_error.source().is_some());
    }
}
