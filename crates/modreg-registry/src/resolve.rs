//! Latest-version lookup across an ordered list of registries.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{RegistryError, Result},
    metadata::MetadataConfig,
};

/// Fetches the raw bytes behind a URL.
///
/// `None` means "nothing there" and is not an error: the registry simply
/// does not know the module, or could not be reached.
pub trait MetadataFetch: Send + Sync {
    fn fetch(&self, url: &str) -> Option<Vec<u8>>;
}

impl<F> MetadataFetch for F
where
    F: Fn(&str) -> Option<Vec<u8>> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    pub version: String,
    pub registry: String,
}

pub fn module_metadata_url(registry: &str, module: &str) -> String {
    let registry = registry.strip_suffix('/').unwrap_or(registry);
    format!("{registry}/modules/{module}/metadata.json")
}

fn latest_version(url: &str, fetch: &dyn MetadataFetch) -> Option<String> {
    let Some(bytes) = fetch.fetch(url) else {
        debug!("no metadata at {url}");
        return None;
    };

    match serde_json::from_slice::<MetadataConfig>(&bytes) {
        Ok(metadata) => metadata.latest_version().map(str::to_string),
        Err(err) => {
            warn!("ignoring unparsable metadata at {url}: {err}");
            None
        }
    }
}

/// Finds the latest version of `module` in the highest-priority registry
/// that has one.
///
/// Every registry is queried concurrently, one blocking task each, and all
/// of them run to completion. Only after every task has joined are the
/// results scanned in `registries` order, so the answer depends on registry
/// priority alone and never on which lookup finished first.
///
/// # Errors
///
/// * [`RegistryError::VersionNotFound`] naming every registry tried, if
///   none of them lists a version.
/// * [`RegistryError::TaskFailed`] if a lookup task panicked.
pub async fn resolve_version(
    module: &str,
    registries: &[String],
    fetch: Arc<dyn MetadataFetch>,
) -> Result<ResolvedVersion> {
    let mut handles = Vec::with_capacity(registries.len());
    for registry in registries {
        let url = module_metadata_url(registry, module);
        let fetch = Arc::clone(&fetch);
        handles.push(tokio::task::spawn_blocking(move || {
            latest_version(&url, fetch.as_ref())
        }));
    }

    let mut slots = Vec::with_capacity(handles.len());
    for handle in handles {
        let version = handle
            .await
            .map_err(|err| RegistryError::TaskFailed(err.to_string()))?;
        slots.push(version);
    }

    registries
        .iter()
        .zip(slots)
        .find_map(|(registry, version)| {
            version.map(|version| {
                ResolvedVersion {
                    version,
                    registry: registry.clone(),
                }
            })
        })
        .ok_or_else(|| {
            RegistryError::VersionNotFound {
                module: module.to_string(),
                registries: registries.to_vec(),
            }
        })
}
