//! Configuration discovery for modreg.
//!
//! Registries are configured the way Bazel configures them: `--registry=`
//! flags in layered `.bazelrc` files that may `import` one another. This
//! crate walks those layers and produces the ordered endpoint list, and
//! locates the workspace root they are relative to.

pub mod bazelrc;
pub mod error;
pub mod workspace;

pub use bazelrc::{
    parse_bazelrc, resolve_registries, resolve_registries_from, ParsedRc, SearchPaths,
    BAZEL_CENTRAL_REGISTRY,
};
pub use error::{ConfigError, Result};
pub use workspace::find_workspace_dir;
