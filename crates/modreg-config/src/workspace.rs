use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

const MODULE_FILE: &str = "MODULE.bazel";

/// Finds the nearest ancestor of `start` (inclusive) that contains a
/// `MODULE.bazel` file.
///
/// `start` is taken as given; pass an absolute path to get an absolute
/// workspace root for `%workspace%` substitution.
pub fn find_workspace_dir(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MODULE_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            ConfigError::WorkspaceNotFound {
                start: start.to_path_buf(),
            }
        })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_find_from_nested_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("ws");
        let nested = root.join("src/lib/deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join(MODULE_FILE), "module(name = \"ws\")\n").unwrap();

        assert_eq!(find_workspace_dir(&nested).unwrap(), root);
        assert_eq!(find_workspace_dir(&root).unwrap(), root);
    }

    #[test]
    fn test_nearest_workspace_wins() {
        let dir = TempDir::new().unwrap();
        let outer = dir.path().join("outer");
        let inner = outer.join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(outer.join(MODULE_FILE), "").unwrap();
        fs::write(inner.join(MODULE_FILE), "").unwrap();

        assert_eq!(find_workspace_dir(&inner).unwrap(), inner);
    }

    #[test]
    fn test_directory_named_module_bazel_is_ignored() {
        let dir = TempDir::new().unwrap();
        let ws = dir.path().join("ws");
        fs::create_dir_all(ws.join(MODULE_FILE)).unwrap();

        let found = find_workspace_dir(&ws);
        if let Ok(found) = found {
            // An ancestor of the temp dir may legitimately be a workspace.
            assert_ne!(found, ws);
        }
    }

    #[test]
    fn test_not_found() {
        let result = find_workspace_dir(Path::new("relative/without/module"));
        assert!(matches!(result, Err(ConfigError::WorkspaceNotFound { .. })));
    }
}
