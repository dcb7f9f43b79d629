//! Source archive handling for modreg.
//!
//! Module source archives arrive as gzip-compressed tarballs. This crate
//! inflates them into memory ([`decompress`]) and reads the resulting tar
//! stream in place ([`TarView`]) without copying entry contents.
//!
//! # Example
//!
//! ```no_run
//! use modreg_archive::{decompress, TarView};
//!
//! fn manifest_of(archive: &[u8]) -> modreg_archive::Result<Option<String>> {
//!     let raw = decompress(archive)?;
//!     let view = TarView::new(&raw);
//!     let manifest = view
//!         .file("MODULE.bazel")?
//!         .map(|entry| entry.contents_str().into_owned());
//!     Ok(manifest)
//! }
//! ```

pub mod decompress;
pub mod error;
pub mod tar;

pub use decompress::decompress;
pub use error::{ArchiveError, Result, TarError};
pub use tar::{Entries, Entry, EntryKind, TarView};
