//! Module-level operations for modreg: reading `MODULE.bazel`, inspecting
//! source archives and adding module versions to a registry directory.

pub mod add_module;
pub mod error;
pub mod inspect;
pub mod manifest;

pub use add_module::{add_module, AddedModule};
pub use error::{CoreError, ManifestError, Result};
pub use inspect::{inspect_archive, manifest_path, ArchiveManifest};
pub use manifest::{BazelDep, ModuleManifest};
