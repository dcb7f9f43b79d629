use modreg_archive::{decompress, Entry, TarView};
use modreg_utils::Integrity;
use tracing::debug;

use crate::{
    error::{CoreError, Result},
    manifest::ModuleManifest,
};

pub const MODULE_FILE: &str = "MODULE.bazel";

/// What a registry needs to know about a source archive.
#[derive(Debug, Clone)]
pub struct ArchiveManifest {
    /// Integrity of the compressed archive as downloaded.
    pub integrity: Integrity,
    /// Path of the manifest inside the archive.
    pub manifest_path: String,
    pub manifest_text: String,
    pub manifest: ModuleManifest,
}

/// `MODULE.bazel` below the optional strip prefix.
pub fn manifest_path(strip_prefix: Option<&str>) -> String {
    match strip_prefix
        .map(|prefix| prefix.trim_matches('/'))
        .filter(|prefix| !prefix.is_empty())
    {
        Some(prefix) => format!("{prefix}/{MODULE_FILE}"),
        None => MODULE_FILE.to_string(),
    }
}

/// Pins, inflates and reads the module manifest of a `.tar.gz` archive.
///
/// # Errors
///
/// * [`CoreError::Archive`] if the archive cannot be decompressed or its
///   tar stream is corrupt.
/// * [`CoreError::ManifestNotFound`] if there is no manifest at the
///   expected path.
/// * [`CoreError::Manifest`] if the manifest does not parse.
pub fn inspect_archive(gzip_bytes: &[u8], strip_prefix: Option<&str>) -> Result<ArchiveManifest> {
    let integrity = Integrity::sha256(gzip_bytes);
    let raw = decompress(gzip_bytes)?;
    let view = TarView::new(&raw);

    let path = manifest_path(strip_prefix);
    let Some(entry) = find_manifest(&view, &path)? else {
        return Err(CoreError::ManifestNotFound { path });
    };
    debug!(
        "found {} ({} bytes) at offset {}",
        entry.name(),
        entry.size(),
        entry.header_offset()
    );

    let manifest_text = entry.contents_str().into_owned();
    let manifest = ModuleManifest::parse(&manifest_text).map_err(|source| {
        CoreError::Manifest {
            document: path.clone(),
            source,
        }
    })?;

    Ok(ArchiveManifest {
        integrity,
        manifest_path: path,
        manifest_text,
        manifest,
    })
}

/// First regular file named `path`. Archives created with `tar -C dir .`
/// prefix every name with `./`, so that spelling matches too.
fn find_manifest<'a>(view: &TarView<'a>, path: &str) -> Result<Option<Entry<'a>>> {
    let dotted = format!("./{path}");
    for entry in view.entries() {
        let entry = entry?;
        if entry.kind().is_file() && (entry.name() == path || entry.name() == dotted) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}
