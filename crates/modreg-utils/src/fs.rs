use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

/// Recursively collects every regular file below `dir`, sorted by path.
///
/// A missing `dir` yields an empty list. Symlinks are not followed and are
/// not reported.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if a directory cannot be listed.
///
/// # Example
///
/// ```no_run
/// use modreg_utils::error::FileSystemResult;
/// use modreg_utils::fs::regular_files;
///
/// fn main() -> FileSystemResult<()> {
///     for file in regular_files("modules/foo/1.0.0/patches")? {
///         println!("{}", file.display());
///     }
///     Ok(())
/// }
/// ```
pub fn regular_files<P: AsRef<Path>>(dir: P) -> FileSystemResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    if dir.is_dir() {
        walk(dir, &mut files)?;
    }

    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> FileSystemResult<()> {
    let to_err = |err| {
        FileSystemError::Directory {
            path: dir.to_path_buf(),
            action: "walk",
            source: err,
        }
    };

    for entry in fs::read_dir(dir).map_err(to_err)? {
        let entry = entry.map_err(to_err)?;
        let file_type = entry.file_type().map_err(to_err)?;
        let path = entry.path();

        if file_type.is_dir() {
            walk(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

/// Renders `path` relative to `base` using `/` separators regardless of
/// platform. Returns `None` if `path` is not below `base`.
pub fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|component| {
            match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            }
        })
        .collect();
    Some(parts.join("/"))
}

/// Writes `contents` to a sibling temporary file and renames it over `path`,
/// so readers observe either the old or the new document, never a partial one.
///
/// # Errors
///
/// * [`FileSystemError::File`] if the temporary file cannot be written or renamed.
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> FileSystemResult<()> {
    let path = path.as_ref();
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents).map_err(|err| {
        FileSystemError::File {
            path: tmp_path.clone(),
            action: "write",
            source: err,
        }
    })?;

    fs::rename(&tmp_path, path).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "replace",
            source: err,
        }
    })
}

/// Creates `path` and all of its parents if they do not exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).map_err(|err| {
        FileSystemError::Directory {
            path: path.to_path_buf(),
            action: "create",
            source: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_regular_files_recurses_and_sorts() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::write(root.join("b/nested/z.patch"), "z").unwrap();
        fs::write(root.join("a.patch"), "a").unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();

        let files = regular_files(root).unwrap();
        assert_eq!(
            files,
            vec![root.join("a.patch"), root.join("b/nested/z.patch")]
        );
    }

    #[test]
    fn test_regular_files_missing_dir() {
        let dir = tempdir().unwrap();
        let files = regular_files(dir.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_relative_slash_path() {
        let base = Path::new("/registry/modules/foo/1.0");
        let path = base.join("overlay").join("sub").join("BUILD.bazel");
        assert_eq!(
            relative_slash_path(&path, base).as_deref(),
            Some("overlay/sub/BUILD.bazel")
        );
        assert_eq!(relative_slash_path(Path::new("/elsewhere"), base), None);
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("source.json");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join("source.json.tmp").exists());
    }

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("modules/foo/1.0.0");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir_exists(&nested).unwrap();
    }
}
