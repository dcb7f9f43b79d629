//! Zero-copy reading of an in-memory tar stream.
//!
//! [`TarView`] borrows a decompressed buffer and hands out [`Entry`] values
//! whose names and contents point back into it. Entries cannot outlive the
//! buffer. Supported variants are what standard archivers emit: V7, USTAR
//! (name prefix), PAX (`x`/`g` records for `path`, `linkpath` and `size`)
//! and GNU long names (`L`/`K`).

mod header;
mod pax;

use std::borrow::Cow;

pub use header::{EntryKind, BLOCK_SIZE};
use header::{is_zero_block, nul_terminated, padded_len, Header};
use pax::Overrides;
use tracing::trace;

use crate::error::TarError;

/// A read-only view over a tar archive held in memory.
#[derive(Debug, Clone, Copy)]
pub struct TarView<'a> {
    bytes: &'a [u8],
}

impl<'a> TarView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Iterates entries in archive order. Metadata records (PAX headers, GNU
    /// long names) are folded into the entry they describe and never yielded.
    pub fn entries(&self) -> Entries<'a> {
        Entries {
            bytes: self.bytes,
            offset: 0,
            globals: Overrides::default(),
            done: false,
        }
    }

    /// Finds the first entry whose resolved name equals `name`.
    ///
    /// # Errors
    ///
    /// Returns the first [`TarError`] met before a match is found.
    pub fn file(&self, name: &str) -> Result<Option<Entry<'a>>, TarError> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.name() == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

impl<'a> IntoIterator for &TarView<'a> {
    type Item = Result<Entry<'a>, TarError>;
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

/// A logical archive member borrowed from a [`TarView`].
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    name: Cow<'a, str>,
    link_name: Option<Cow<'a, str>>,
    kind: EntryKind,
    contents: &'a [u8],
    header_offset: usize,
}

impl<'a> Entry<'a> {
    /// Resolved name: PAX `path` or GNU long name, then USTAR
    /// `prefix/name`, then the static name field.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn link_name(&self) -> Option<&str> {
        self.link_name.as_deref()
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Content size, after any PAX `size` override.
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn contents(&self) -> &'a [u8] {
        self.contents
    }

    /// Contents as text, replacing invalid UTF-8 sequences.
    pub fn contents_str(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.contents)
    }

    /// Offset of this entry's own header block (after any metadata records).
    pub fn header_offset(&self) -> usize {
        self.header_offset
    }
}

/// Iterator over the entries of a [`TarView`].
///
/// Yields `Err` once on structural corruption and then stops.
pub struct Entries<'a> {
    bytes: &'a [u8],
    offset: usize,
    globals: Overrides<'a>,
    done: bool,
}

impl<'a> Entries<'a> {
    fn block(&self, offset: usize) -> Option<&'a [u8]> {
        let bytes = self.bytes;
        bytes.get(offset..offset.checked_add(BLOCK_SIZE)?)
    }

    fn slice(&self, offset: usize, len: u64) -> Result<&'a [u8], TarError> {
        let bytes = self.bytes;
        let truncated = || {
            TarError::Truncated {
                offset,
                needed: len,
                available: bytes.len().saturating_sub(offset),
            }
        };
        let len = usize::try_from(len).map_err(|_| truncated())?;
        let end = offset.checked_add(len).ok_or_else(truncated)?;
        bytes.get(offset..end).ok_or_else(truncated)
    }

    fn skip_padded(&mut self, data_start: usize, len: u64) -> Result<(), TarError> {
        let padded = padded_len(len)
            .and_then(|padded| usize::try_from(padded).ok())
            .and_then(|padded| data_start.checked_add(padded))
            .ok_or(TarError::Truncated {
                offset: data_start,
                needed: len,
                available: self.bytes.len().saturating_sub(data_start),
            })?;
        self.offset = padded;
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Entry<'a>>, TarError> {
        let mut local = Overrides::default();

        loop {
            let header_offset = self.offset;
            let remaining = self.bytes.len().saturating_sub(header_offset);
            if remaining == 0 {
                return Ok(None);
            }

            let block = self.block(header_offset).ok_or(TarError::Truncated {
                offset: header_offset,
                needed: BLOCK_SIZE as u64,
                available: remaining,
            })?;

            if is_zero_block(block) {
                // End of archive is two zero blocks. A lone one is skipped.
                match self.block(header_offset + BLOCK_SIZE) {
                    Some(next) if !is_zero_block(next) => {
                        self.offset += BLOCK_SIZE;
                        continue;
                    }
                    _ => return Ok(None),
                }
            }

            let header = Header::new(block, header_offset);
            let kind = header.kind();
            let data_start = header_offset + BLOCK_SIZE;

            if kind.is_metadata() {
                let len = header.size()?;
                let data = self.slice(data_start, len)?;
                match kind {
                    EntryKind::GlobalExtendedHeader => {
                        pax::parse_records(data, data_start, &mut self.globals)?;
                    }
                    EntryKind::ExtendedHeader => {
                        pax::parse_records(data, data_start, &mut local)?;
                    }
                    EntryKind::GnuLongName => local.path = Some(nul_terminated(data)),
                    _ => local.linkpath = Some(nul_terminated(data)),
                }
                trace!(offset = header_offset, ?kind, "folded metadata record");
                self.skip_padded(data_start, len)?;
                continue;
            }

            let overrides = local.or(self.globals);
            let size = match overrides.size {
                Some(size) => size,
                None => header.size()?,
            };
            let contents = self.slice(data_start, size)?;

            let name = match overrides.path {
                Some(path) => String::from_utf8_lossy(path),
                None => header.name(),
            };
            let link_name = match overrides.linkpath {
                Some(link) => Some(String::from_utf8_lossy(link)),
                None => header.link_name(),
            };

            self.skip_padded(data_start, size)?;

            return Ok(Some(Entry {
                name,
                link_name,
                kind,
                contents,
                header_offset,
            }));
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>, TarError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Entries<'_> {}
