use std::{
    collections::HashSet,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use modreg_utils::path::{PathResolver, SystemPathResolver};
use tracing::{debug, trace};

use crate::error::{ConfigError, Result};

/// Endpoint used when no configuration file names a registry.
pub const BAZEL_CENTRAL_REGISTRY: &str = "https://bcr.bazel.build";

const WORKSPACE_TOKEN: &str = "%workspace%";
const REGISTRY_FLAG: &str = "--registry=";
const IMPORT_KEYWORDS: [&str; 2] = ["try-import", "import"];

/// Directives extracted from a single rc file, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedRc {
    pub registries: Vec<String>,
    pub imports: Vec<String>,
}

/// Parses the contents of one rc file without following imports.
///
/// Import paths are returned verbatim; `%workspace%` substitution happens
/// when they are followed.
pub fn parse_bazelrc(contents: &str) -> ParsedRc {
    let mut parsed = ParsedRc::default();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(path) = import_target(line) {
            parsed.imports.push(path.to_string());
        } else if let Some(registry) = registry_flag(line) {
            parsed.registries.push(registry.to_string());
        }
    }

    parsed
}

/// `import <path>` or `try-import <path>`. The keyword has to be followed by
/// whitespace so that lines like `important ...` are not imports.
fn import_target(line: &str) -> Option<&str> {
    IMPORT_KEYWORDS.iter().find_map(|keyword| {
        let rest = line.strip_prefix(keyword)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim();
        (!path.is_empty()).then_some(path)
    })
}

/// Value of the first `--registry=` on the line. Anything from a second
/// `--registry=` onwards is dropped.
fn registry_flag(line: &str) -> Option<&str> {
    let start = line.find(REGISTRY_FLAG)? + REGISTRY_FLAG.len();
    let rest = &line[start..];
    let value = match rest.find(REGISTRY_FLAG) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// The ordered list of top-level rc files consulted for registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    paths: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Default layering: workspace, user, then system.
    ///
    /// The system file is `bazel.bazelrc` in the platform config directory
    /// unless the crate was built with `MODREG_SYSTEM_BAZELRC` set, in which
    /// case that path is used instead.
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self::with_resolver(workspace_root, &SystemPathResolver)
    }

    pub fn with_resolver<R: PathResolver>(workspace_root: &Path, resolver: &R) -> Self {
        let mut paths = vec![workspace_root.join(".bazelrc")];

        if let Some(home) = resolver.home_dir() {
            paths.push(home.join(".bazelrc"));
        }

        match option_env!("MODREG_SYSTEM_BAZELRC") {
            Some(path) => paths.push(PathBuf::from(path)),
            None => {
                if let Some(dir) = resolver.system_config_dir() {
                    paths.push(dir.join("bazel.bazelrc"));
                }
            }
        }

        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Resolves the registry endpoints for a workspace using the default
/// search path.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// let registries = modreg_config::resolve_registries(Path::new("/src/my_module")).unwrap();
/// assert!(!registries.is_empty());
/// ```
pub fn resolve_registries(workspace_root: &Path) -> Result<Vec<String>> {
    resolve_registries_from(&SearchPaths::for_workspace(workspace_root), workspace_root)
}

/// Resolves registry endpoints from an explicit list of top-level rc files.
///
/// Each file contributes its own `--registry=` values first, followed by
/// those of its imports, depth-first. Results of the top-level files are
/// concatenated in order without deduplication. An empty result becomes
/// [`BAZEL_CENTRAL_REGISTRY`].
///
/// # Errors
///
/// Missing files are skipped. Any other read failure is a
/// [`ConfigError::Read`].
pub fn resolve_registries_from(
    search_paths: &SearchPaths,
    workspace_root: &Path,
) -> Result<Vec<String>> {
    let mut registries = Vec::new();

    for path in search_paths.paths() {
        // Cycle detection is scoped to one top-level file.
        let mut visited = HashSet::from([path.to_string_lossy().into_owned()]);
        collect_registries(path, workspace_root, &mut visited, &mut registries)?;
    }

    if registries.is_empty() {
        debug!("no registries configured, using {BAZEL_CENTRAL_REGISTRY}");
        registries.push(BAZEL_CENTRAL_REGISTRY.to_string());
    }

    Ok(registries)
}

fn collect_registries(
    path: &Path,
    workspace_root: &Path,
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
) -> Result<()> {
    let Some(contents) = read_rc(path)? else {
        trace!("skipping missing rc file {}", path.display());
        return Ok(());
    };
    debug!("reading rc file {}", path.display());

    let parsed = parse_bazelrc(&contents);
    for registry in &parsed.registries {
        trace!("{}: registry {registry}", path.display());
    }
    out.extend(parsed.registries);

    for import in parsed.imports {
        let import = import.replace(WORKSPACE_TOKEN, &workspace_root.to_string_lossy());
        if !visited.insert(import.clone()) {
            debug!("skipping already visited import {import}");
            continue;
        }

        let import_path = Path::new(&import);
        let import_path = if import_path.is_relative() {
            workspace_root.join(import_path)
        } else {
            import_path.to_path_buf()
        };
        collect_registries(&import_path, workspace_root, visited, out)?;
    }

    Ok(())
}

fn read_rc(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => {
            Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}
