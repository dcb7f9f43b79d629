//! Registry-side documents and algorithms for modreg.
//!
//! A Bazel registry is a directory tree (or a web server mirroring one):
//!
//! ```text
//! bazel_registry.json
//! modules/<name>/metadata.json
//! modules/<name>/<version>/source.json
//! modules/<name>/<version>/MODULE.bazel
//! modules/<name>/<version>/patches/...
//! modules/<name>/<version>/overlay/...
//! ```
//!
//! This crate provides the [`SourceConfig`] and [`MetadataConfig`] models,
//! the integrity refresh of a version directory, and the multi-registry
//! version lookup.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use modreg_registry::{resolve_version, MetadataFetch};
//!
//! async fn latest(registries: &[String]) -> modreg_registry::Result<String> {
//!     let fetch: Arc<dyn MetadataFetch> =
//!         Arc::new(|url: &str| std::fs::read(url.trim_start_matches("file://")).ok());
//!     let resolved = resolve_version("rules_cc", registries, fetch).await?;
//!     Ok(resolved.version)
//! }
//! ```

mod document;
pub mod error;
pub mod metadata;
pub mod resolve;
pub mod source;

pub use error::{ErrorContext, RegistryError, Result};
pub use metadata::{Maintainer, MetadataConfig};
pub use resolve::{module_metadata_url, resolve_version, MetadataFetch, ResolvedVersion};
pub use source::{refresh_module_integrity, refresh_source_integrity, SourceConfig};

/// Marker file at the root of every registry directory.
pub const REGISTRY_FILE: &str = "bazel_registry.json";
