//! `modules/<name>/<version>/source.json` and its integrity refresh.

use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use modreg_utils::{
    error::HashError,
    fs::{regular_files, relative_slash_path},
    hash::file_integrity,
    Integrity,
};
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    document::{read_json, write_json},
    error::{RegistryError, Result},
    metadata::MetadataConfig,
    REGISTRY_FILE,
};

const PATCHES_DIR: &str = "patches";
const OVERLAY_DIR: &str = "overlay";

/// How to fetch and prepare the sources of one module version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub integrity: String,

    #[serde(default)]
    pub strip_prefix: String,

    #[serde(default)]
    pub patch_strip: u32,

    /// Patch file (relative to `patches/`) to integrity.
    #[serde(default)]
    pub patches: BTreeMap<String, String>,

    /// Overlay file (relative to `overlay/`) to integrity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overlay: BTreeMap<String, String>,

    pub url: String,

    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Patches,
    Overlay,
}

/// One file to hash. Every slot is written by exactly one task.
struct Slot {
    path: String,
    target: Target,
    key: String,
    integrity: Option<Integrity>,
    error: Option<HashError>,
}

impl Slot {
    fn new(path: String, target: Target, key: String) -> Self {
        Self {
            path,
            target,
            key,
            integrity: None,
            error: None,
        }
    }
}

impl SourceConfig {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// Recomputes the `patches` and `overlay` maps from the files on disk.
    ///
    /// Every regular file under `module_dir/patches` and `module_dir/overlay`
    /// is hashed, as is every already registered key that points outside
    /// `module_dir` (leading `..`). Files are hashed in parallel.
    ///
    /// # Errors
    ///
    /// If any file cannot be read, [`RegistryError::IntegrityRefresh`] lists
    /// every failure and `self` is left untouched.
    pub fn refresh_integrity(&mut self, module_dir: &Path) -> Result<()> {
        let mut slots = self.collect_slots(module_dir)?;

        slots.par_iter_mut().for_each(|slot| {
            match file_integrity(module_dir.join(&slot.path)) {
                Ok(integrity) => slot.integrity = Some(integrity),
                Err(err) => slot.error = Some(err),
            }
        });

        let failures: Vec<HashError> = slots.iter_mut().filter_map(|s| s.error.take()).collect();
        if !failures.is_empty() {
            return Err(RegistryError::IntegrityRefresh {
                dir: module_dir.to_path_buf(),
                failures,
            });
        }

        self.patches.clear();
        self.overlay.clear();

        for slot in slots {
            let Some(integrity) = slot.integrity else {
                continue;
            };
            debug!("{}: {integrity}", slot.path);
            let map = match slot.target {
                Target::Patches => &mut self.patches,
                Target::Overlay => &mut self.overlay,
            };
            map.insert(slot.key, integrity.to_string());
        }

        Ok(())
    }

    fn collect_slots(&self, module_dir: &Path) -> Result<Vec<Slot>> {
        let mut slots = Vec::new();

        for (dir, target) in [(PATCHES_DIR, Target::Patches), (OVERLAY_DIR, Target::Overlay)] {
            let root = module_dir.join(dir);
            for file in regular_files(&root)? {
                let (Some(path), Some(key)) = (
                    relative_slash_path(&file, module_dir),
                    relative_slash_path(&file, &root),
                ) else {
                    continue;
                };
                slots.push(Slot::new(path, target, key));
            }
        }

        // Out-of-tree entries cannot be rediscovered on disk, so they are
        // rehashed under their existing key and stay in their map.
        for (map, target) in [(&self.patches, Target::Patches), (&self.overlay, Target::Overlay)] {
            for key in map.keys().filter(|key| is_outside(key)) {
                slots.push(Slot::new(key.clone(), target, key.clone()));
            }
        }

        Ok(slots)
    }
}

fn is_outside(relative: &str) -> bool {
    matches!(
        Path::new(relative).components().next(),
        Some(Component::ParentDir)
    )
}

/// Refreshes the patch and overlay integrities of one `source.json`,
/// resolving files relative to its directory. The document is rewritten
/// only if every file hashed successfully.
pub fn refresh_source_integrity(source_json: &Path) -> Result<SourceConfig> {
    let module_dir = source_json.parent().unwrap_or(Path::new("."));
    let mut source = SourceConfig::load(source_json)?;

    source.refresh_integrity(module_dir)?;

    info!("updating {}", source_json.display());
    source.save(source_json)?;
    Ok(source)
}

/// Runs [`refresh_source_integrity`] for every version of `module` listed
/// in its `metadata.json`. Returns the rewritten `source.json` paths.
///
/// A failing version does not stop the others. If any failed, the result
/// is [`RegistryError::ModuleRefresh`] carrying each version's error.
pub fn refresh_module_integrity(registry_dir: &Path, module: &str) -> Result<Vec<PathBuf>> {
    let registry_file = registry_dir.join(REGISTRY_FILE);
    if !registry_file.is_file() {
        return Err(RegistryError::MissingRegistryFile {
            path: registry_file,
        });
    }

    let module_dir = registry_dir.join("modules").join(module);
    let metadata_path = module_dir.join("metadata.json");
    if !metadata_path.is_file() {
        return Err(RegistryError::ModuleNotFound {
            module: module.to_string(),
            path: metadata_path,
        });
    }

    let metadata = MetadataConfig::load(&metadata_path)?;
    let mut updated = Vec::with_capacity(metadata.versions.len());
    let mut failed = Vec::new();
    let mut failures = Vec::new();
    for version in &metadata.versions {
        let source_json = module_dir.join(version).join("source.json");
        match refresh_source_integrity(&source_json) {
            Ok(_) => updated.push(source_json),
            Err(err) => {
                warn!("failed to refresh {module}@{version}: {err}");
                failed.push(version.clone());
                failures.push(err);
            }
        }
    }

    if !failures.is_empty() {
        return Err(RegistryError::ModuleRefresh {
            module: module.to_string(),
            versions: failed,
            failures,
        });
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use modreg_utils::digest;
    use tempfile::TempDir;

    use super::*;

    const SOURCE_JSON: &str = r#"{
    "integrity": "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
    "strip_prefix": "rules_foo-1.0.0",
    "patch_strip": 1,
    "patches": {
        "stale.patch": "sha256-stale",
        "../shared/common.patch": "sha256-stale"
    },
    "url": "https://example.test/rules_foo-1.0.0.tar.gz",
    "mirror_urls": ["https://mirror.test/rules_foo-1.0.0.tar.gz"]
}
"#;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// `<tmp>/modules/rules_foo/1.0.0/` with patches, overlay and an
    /// out-of-tree shared patch.
    fn module_fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let registry = dir.path();
        write(&registry.join(REGISTRY_FILE), "{\"mirrors\": []}\n");
        write(
            &registry.join("modules/rules_foo/metadata.json"),
            r#"{"versions": ["1.0.0"]}"#,
        );

        let version_dir = registry.join("modules/rules_foo/1.0.0");
        write(&version_dir.join("source.json"), SOURCE_JSON);
        write(&version_dir.join("patches/fix.patch"), "fix\n");
        write(&version_dir.join("patches/nested/more.patch"), "more\n");
        write(&version_dir.join("overlay/BUILD.bazel"), "# build\n");
        write(&registry.join("modules/rules_foo/shared/common.patch"), "common\n");

        (dir, version_dir)
    }

    #[test]
    fn test_refresh_source_integrity() {
        let (_dir, version_dir) = module_fixture();
        let source_json = version_dir.join("source.json");

        let source = refresh_source_integrity(&source_json).unwrap();

        assert_eq!(
            source.patches,
            BTreeMap::from([
                ("fix.patch".to_string(), digest(b"fix\n")),
                ("nested/more.patch".to_string(), digest(b"more\n")),
                ("../shared/common.patch".to_string(), digest(b"common\n")),
            ])
        );
        assert_eq!(
            source.overlay,
            BTreeMap::from([("BUILD.bazel".to_string(), digest(b"# build\n"))])
        );

        let reloaded = SourceConfig::load(&source_json).unwrap();
        assert_eq!(reloaded, source);
        assert_eq!(reloaded.strip_prefix, "rules_foo-1.0.0");
        assert_eq!(reloaded.patch_strip, 1);
        assert!(reloaded.extras.contains_key("mirror_urls"));
    }

    #[test]
    fn test_refresh_reports_every_failure_and_writes_nothing() {
        let (_dir, version_dir) = module_fixture();
        let source_json = version_dir.join("source.json");
        let before = fs::read(&source_json).unwrap();

        let mut source = SourceConfig::load(&source_json).unwrap();
        source
            .patches
            .insert("../missing/one.patch".to_string(), String::new());
        source
            .overlay
            .insert("../missing/two.bzl".to_string(), String::new());
        source.save(&source_json).unwrap();
        let saved = fs::read(&source_json).unwrap();
        assert_ne!(before, saved);

        let err = refresh_source_integrity(&source_json).unwrap_err();
        match err {
            RegistryError::IntegrityRefresh { failures, .. } => {
                let mut paths: Vec<_> = failures
                    .iter()
                    .map(|failure| {
                        match failure {
                            HashError::ReadFailed { path, .. } => path.clone(),
                            other => panic!("unexpected failure {other}"),
                        }
                    })
                    .collect();
                paths.sort();
                assert_eq!(
                    paths,
                    [
                        version_dir.join("../missing/one.patch"),
                        version_dir.join("../missing/two.bzl"),
                    ]
                );
            }
            other => panic!("unexpected error {other}"),
        }

        assert_eq!(fs::read(&source_json).unwrap(), saved);
    }

    #[test]
    fn test_refresh_in_memory_is_all_or_nothing() {
        let (_dir, version_dir) = module_fixture();
        let mut source = SourceConfig::load(&version_dir.join("source.json")).unwrap();
        source
            .patches
            .insert("../gone.patch".to_string(), "sha256-old".to_string());
        let original = source.clone();

        assert!(source.refresh_integrity(&version_dir).is_err());
        assert_eq!(source, original);
    }

    #[test]
    fn test_refresh_without_patch_dirs_clears_maps() {
        let dir = TempDir::new().unwrap();
        let source_json = dir.path().join("source.json");
        write(
            &source_json,
            r#"{"url": "https://example.test/a.tar.gz", "patches": {"old.patch": "sha256-x"}}"#,
        );

        let source = refresh_source_integrity(&source_json).unwrap();
        assert!(source.patches.is_empty());
        assert!(source.overlay.is_empty());

        let written = fs::read_to_string(&source_json).unwrap();
        assert!(written.contains("\"patches\": {}"));
        assert!(!written.contains("overlay"));
    }

    #[test]
    fn test_refresh_module_integrity() {
        let (dir, version_dir) = module_fixture();

        let updated = refresh_module_integrity(dir.path(), "rules_foo").unwrap();
        assert_eq!(updated, [version_dir.join("source.json")]);

        let source = SourceConfig::load(&version_dir.join("source.json")).unwrap();
        assert_eq!(source.patches.get("fix.patch"), Some(&digest(b"fix\n")));
    }

    #[test]
    fn test_refresh_module_continues_past_failing_version() {
        let (dir, _) = module_fixture();
        let module_dir = dir.path().join("modules/rules_foo");
        write(
            &module_dir.join("metadata.json"),
            r#"{"versions": ["1.0.0", "2.0.0"]}"#,
        );
        write(
            &module_dir.join("1.0.0/source.json"),
            r#"{"url": "https://example.test/a.tar.gz", "patches": {"../gone.patch": "sha256-x"}}"#,
        );
        write(
            &module_dir.join("2.0.0/source.json"),
            r#"{"url": "https://example.test/b.tar.gz"}"#,
        );
        write(&module_dir.join("2.0.0/patches/a.patch"), "a\n");

        let err = refresh_module_integrity(dir.path(), "rules_foo").unwrap_err();
        match err {
            RegistryError::ModuleRefresh {
                versions, failures, ..
            } => {
                assert_eq!(versions, ["1.0.0"]);
                assert_eq!(failures.len(), 1);
                assert!(matches!(
                    failures[0],
                    RegistryError::IntegrityRefresh { .. }
                ));
            }
            other => panic!("unexpected error {other}"),
        }

        let source = SourceConfig::load(&module_dir.join("2.0.0/source.json")).unwrap();
        assert_eq!(
            source.patches,
            BTreeMap::from([("a.patch".to_string(), digest(b"a\n"))])
        );
    }

    #[test]
    fn test_refresh_module_requires_registry() {
        let (dir, _) = module_fixture();
        fs::remove_file(dir.path().join(REGISTRY_FILE)).unwrap();

        let result = refresh_module_integrity(dir.path(), "rules_foo");
        assert!(matches!(
            result,
            Err(RegistryError::MissingRegistryFile { .. })
        ));
    }

    #[test]
    fn test_refresh_unknown_module() {
        let (dir, _) = module_fixture();
        let result = refresh_module_integrity(dir.path(), "rules_bar");
        assert!(matches!(result, Err(RegistryError::ModuleNotFound { .. })));
    }

    #[test]
    fn test_is_outside() {
        assert!(is_outside("../x.patch"));
        assert!(is_outside(".."));
        assert!(!is_outside("patches/x.patch"));
        assert!(!is_outside("..x.patch"));
    }
}
