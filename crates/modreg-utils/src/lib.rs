//! Shared helpers for the modreg crates: content integrity, filesystem
//! traversal and user directory lookup.

pub mod error;
pub mod fs;
pub mod hash;
pub mod path;

pub use hash::{digest, file_integrity, Integrity};
