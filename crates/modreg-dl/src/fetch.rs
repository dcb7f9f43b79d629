use std::{fs, io::ErrorKind};

use modreg_registry::MetadataFetch;
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{DownloadError, Result},
    http_client::SHARED_AGENT,
};

/// Fetches `http(s)://` URLs through the shared agent and `file://` URLs
/// from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fetcher;

impl Fetcher {
    pub fn new() -> Self {
        Self
    }

    /// Returns the bytes behind `url`, or `None` if there is nothing there
    /// (HTTP 404, missing file).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use modreg_dl::Fetcher;
    ///
    /// let metadata = Fetcher::new()
    ///     .fetch_bytes("https://bcr.bazel.build/modules/zlib/metadata.json")
    ///     .unwrap();
    /// assert!(metadata.is_some());
    /// ```
    pub fn fetch_bytes(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let parsed = Url::parse(url).map_err(|source| {
            DownloadError::InvalidUrl {
                url: url.to_string(),
                source,
            }
        })?;

        match parsed.scheme() {
            "http" | "https" => fetch_http(url),
            "file" => fetch_file(&parsed),
            scheme => {
                Err(DownloadError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    url: url.to_string(),
                })
            }
        }
    }
}

fn fetch_http(url: &str) -> Result<Option<Vec<u8>>> {
    debug!("GET {url}");
    let resp = match SHARED_AGENT.get(url).call() {
        Ok(resp) => resp,
        Err(ureq::Error::StatusCode(404)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let bytes = resp
        .into_body()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()?;
    Ok(Some(bytes))
}

fn fetch_file(url: &Url) -> Result<Option<Vec<u8>>> {
    let Ok(path) = url.to_file_path() else {
        return Err(DownloadError::UnsupportedScheme {
            scheme: "file".to_string(),
            url: url.to_string(),
        });
    };

    debug!("reading {}", path.display());
    match fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DownloadError::Io { path, source }),
    }
}

impl MetadataFetch for Fetcher {
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        match self.fetch_bytes(url) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to fetch {url}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn file_url(path: &std::path::Path) -> String {
        Url::from_file_path(path).unwrap().to_string()
    }

    #[test]
    fn test_fetch_file_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, b"{\"versions\": [\"1.0.0\"]}").unwrap();

        let bytes = Fetcher::new().fetch_bytes(&file_url(&path)).unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"{\"versions\": [\"1.0.0\"]}"[..]));
    }

    #[test]
    fn test_fetch_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let url = file_url(&dir.path().join("nope.json"));

        assert!(Fetcher::new().fetch_bytes(&url).unwrap().is_none());
        assert!(Fetcher::new().fetch(&url).is_none());
    }

    #[test]
    fn test_invalid_url() {
        let result = Fetcher::new().fetch_bytes("not a url");
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[test]
    fn test_unsupported_scheme() {
        let result = Fetcher::new().fetch_bytes("ftp://example.test/a.tar.gz");
        assert!(matches!(
            result,
            Err(DownloadError::UnsupportedScheme { .. })
        ));
        assert!(Fetcher::new().fetch("ftp://example.test/a.tar.gz").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = Fetcher::new().fetch_bytes(&file_url(dir.path()));
        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }
}
