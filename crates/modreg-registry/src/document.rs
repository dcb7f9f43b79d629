//! JSON document persistence shared by `source.json` and `metadata.json`.

use std::{fs, path::Path};

use modreg_utils::fs::write_atomic;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::error::{ErrorContext, RegistryError, Result};

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|source| {
        RegistryError::Json {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Serializes with a 4-space indent and a trailing newline.
pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_pretty_json(value).map_err(|source| {
        RegistryError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    write_atomic(path, &bytes)?;
    Ok(())
}
