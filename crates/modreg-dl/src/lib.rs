//! Byte fetching for registry documents and source archives.

pub mod error;
pub mod fetch;
pub mod http_client;

pub use error::{DownloadError, Result};
pub use fetch::Fetcher;
