//! Adds a module version to a local registry directory from a source
//! archive URL.

use std::path::{Path, PathBuf};

use modreg_registry::{MetadataConfig, MetadataFetch, RegistryError, SourceConfig, REGISTRY_FILE};
use modreg_utils::{
    fs::{ensure_dir_exists, write_atomic},
    Integrity,
};
use tracing::{info, warn};
use url::Url;

use crate::{
    error::{CoreError, Result},
    inspect::{inspect_archive, ArchiveManifest, MODULE_FILE},
};

const ARCHIVE_EXTENSIONS: [&str; 2] = [".tar.gz", ".tgz"];

#[derive(Debug, Clone)]
pub struct AddedModule {
    pub name: String,
    pub version: String,
    pub integrity: Integrity,
    pub version_dir: PathBuf,
}

/// Downloads `archive_url`, reads its `MODULE.bazel` and registers the
/// version under `registry_dir/modules/<name>/<version>/`.
///
/// Writes `source.json` and a copy of `MODULE.bazel`, then appends the
/// version to `metadata.json` (created if needed). When the metadata has no
/// repository yet, one is inferred from GitHub archive URLs.
///
/// Nothing is written unless the archive was fetched and parsed and the
/// version is new to the registry.
pub fn add_module(
    registry_dir: &Path,
    archive_url: &str,
    strip_prefix: Option<&str>,
    fetch: &dyn MetadataFetch,
) -> Result<AddedModule> {
    let registry_file = registry_dir.join(REGISTRY_FILE);
    if !registry_file.is_file() {
        return Err(RegistryError::MissingRegistryFile {
            path: registry_file,
        }
        .into());
    }

    let url = parse_archive_url(archive_url)?;

    info!("fetching {archive_url}");
    let archive = fetch.fetch(archive_url).ok_or_else(|| {
        CoreError::DownloadFailed {
            url: archive_url.to_string(),
        }
    })?;

    let ArchiveManifest {
        integrity,
        manifest_path,
        manifest_text,
        manifest,
    } = inspect_archive(&archive, strip_prefix)?;

    let Some(version) = manifest.version else {
        return Err(CoreError::MissingVersion {
            document: manifest_path,
        });
    };
    check_path_component("module name", &manifest.name)?;
    check_path_component("version", &version)?;

    let module_dir = registry_dir.join("modules").join(&manifest.name);
    let metadata_path = module_dir.join("metadata.json");
    let mut metadata = if metadata_path.is_file() {
        MetadataConfig::load(&metadata_path)?
    } else {
        MetadataConfig::default()
    };

    if metadata.has_version(&version) {
        return Err(CoreError::VersionExists {
            module: manifest.name,
            version,
        });
    }
    metadata.versions.push(version.clone());

    if !metadata.has_repository() {
        match infer_repository(&url) {
            Some(repository) => metadata.repository = Some(vec![repository]),
            None => {
                warn!(
                    "unable to infer repository from {archive_url}, please add it to {} manually",
                    metadata_path.display()
                );
            }
        }
    }
    if metadata.maintainers.is_empty() {
        warn!("'maintainers' list is empty in {}", metadata_path.display());
    }
    if metadata.homepage.is_empty() {
        warn!("'homepage' is empty in {}", metadata_path.display());
    }

    let version_dir = module_dir.join(&version);
    ensure_dir_exists(&version_dir)?;

    let source = SourceConfig {
        integrity: integrity.to_string(),
        strip_prefix: strip_prefix.unwrap_or_default().to_string(),
        url: archive_url.to_string(),
        ..SourceConfig::default()
    };
    source.save(&version_dir.join("source.json"))?;
    write_atomic(version_dir.join(MODULE_FILE), manifest_text.as_bytes())?;
    metadata.save(&metadata_path)?;

    info!("added {}@{version}", manifest.name);
    Ok(AddedModule {
        name: manifest.name,
        version,
        integrity,
        version_dir,
    })
}

fn parse_archive_url(archive_url: &str) -> Result<Url> {
    let invalid = |reason: String| {
        CoreError::InvalidArchiveUrl {
            url: archive_url.to_string(),
            reason,
        }
    };

    let url = Url::parse(archive_url).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "https" | "http" | "file") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }

    let file = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    if !ARCHIVE_EXTENSIONS.iter().any(|ext| file.ends_with(ext)) {
        return Err(CoreError::UnsupportedArchive {
            file: file.to_string(),
        });
    }

    Ok(url)
}

/// `https://github.com/<owner>/<repo>/...` becomes `github:<owner>/<repo>`.
fn infer_repository(url: &Url) -> Option<String> {
    if url.host_str() != Some("github.com") {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    Some(format!("github:{owner}/{repo}"))
}

fn check_path_component(what: &'static str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidPathComponent {
            what,
            value: value.to_string(),
        })
    }
}
