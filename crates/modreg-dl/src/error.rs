use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(modreg_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme `{scheme}`: {url}")]
    #[diagnostic(
        code(modreg_dl::unsupported_scheme),
        help("Only http://, https:// and file:// URLs can be fetched")
    )]
    UnsupportedScheme { scheme: String, url: String },

    #[error(transparent)]
    #[diagnostic(
        code(modreg_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("Failed to read `{}`: {source}", .path.display())]
    #[diagnostic(code(modreg_dl::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}
