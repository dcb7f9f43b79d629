//! Field access for a single 512-byte tar header block.

use std::{borrow::Cow, ops::Range};

use crate::error::TarError;

pub const BLOCK_SIZE: usize = 512;

const NAME: Range<usize> = 0..100;
const SIZE: Range<usize> = 124..136;
const TYPEFLAG: usize = 156;
const LINK_NAME: Range<usize> = 157..257;
const MAGIC: Range<usize> = 257..263;
const PREFIX: Range<usize> = 345..500;

/// Classification of a tar record by its type flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Contiguous,
    /// PAX `g` record; applies to every following entry.
    GlobalExtendedHeader,
    /// PAX `x` record; applies to the next entry only.
    ExtendedHeader,
    /// GNU `L` record holding the next entry's name.
    GnuLongName,
    /// GNU `K` record holding the next entry's link target.
    GnuLongLink,
    Other(u8),
}

impl EntryKind {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            b'\0' | b'0' => EntryKind::Regular,
            b'1' => EntryKind::HardLink,
            b'2' => EntryKind::Symlink,
            b'3' => EntryKind::CharDevice,
            b'4' => EntryKind::BlockDevice,
            b'5' => EntryKind::Directory,
            b'6' => EntryKind::Fifo,
            b'7' => EntryKind::Contiguous,
            b'g' => EntryKind::GlobalExtendedHeader,
            b'x' => EntryKind::ExtendedHeader,
            b'L' => EntryKind::GnuLongName,
            b'K' => EntryKind::GnuLongLink,
            other => EntryKind::Other(other),
        }
    }

    /// Records that describe the following entry instead of being one.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            EntryKind::GlobalExtendedHeader
                | EntryKind::ExtendedHeader
                | EntryKind::GnuLongName
                | EntryKind::GnuLongLink
        )
    }

    /// Regular file content, including the rarely used contiguous type.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::Regular | EntryKind::Contiguous)
    }
}

pub(crate) struct Header<'a> {
    block: &'a [u8],
    offset: usize,
}

impl<'a> Header<'a> {
    /// `block` must be exactly [`BLOCK_SIZE`] bytes long.
    pub fn new(block: &'a [u8], offset: usize) -> Self {
        debug_assert_eq!(block.len(), BLOCK_SIZE);
        Self { block, offset }
    }

    pub fn kind(&self) -> EntryKind {
        EntryKind::from_flag(self.block[TYPEFLAG])
    }

    pub fn size(&self) -> Result<u64, TarError> {
        parse_numeric(&self.block[SIZE]).ok_or_else(|| {
            TarError::InvalidNumber {
                field: "size",
                offset: self.offset + SIZE.start,
                value: String::from_utf8_lossy(&self.block[SIZE]).into_owned(),
            }
        })
    }

    fn is_ustar(&self) -> bool {
        let magic = &self.block[MAGIC];
        &magic[..5] == b"ustar" && matches!(magic[5], b'\0' | b' ')
    }

    /// Name from the static fields: `prefix/name` for USTAR headers with a
    /// non-empty prefix, otherwise the 100-byte name field.
    pub fn name(&self) -> Cow<'a, str> {
        let block = self.block;
        let name = name_field(&block[NAME]);

        if self.is_ustar() {
            let prefix = nul_terminated(&block[PREFIX]);
            if !prefix.is_empty() {
                return Cow::Owned(format!(
                    "{}/{}",
                    String::from_utf8_lossy(prefix),
                    String::from_utf8_lossy(name)
                ));
            }
        }

        String::from_utf8_lossy(name)
    }

    pub fn link_name(&self) -> Option<Cow<'a, str>> {
        let block = self.block;
        let link = name_field(&block[LINK_NAME]);
        (!link.is_empty()).then(|| String::from_utf8_lossy(link))
    }
}

/// The name field is used verbatim when its last byte is set, since a
/// 100-byte name leaves no room for a terminator.
fn name_field(field: &[u8]) -> &[u8] {
    match field.last() {
        Some(0) => nul_terminated(field),
        _ => field,
    }
}

pub(crate) fn nul_terminated(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Parses a numeric header field: octal ASCII padded with spaces or NULs,
/// or GNU base-256 when the high bit of the first byte is set.
fn parse_numeric(field: &[u8]) -> Option<u64> {
    if field.first().is_some_and(|&b| b & 0x80 != 0) {
        // 0xff marks a negative base-256 value, which is meaningless for sizes.
        if field[0] != 0x80 {
            return None;
        }
        return field[1..]
            .iter()
            .try_fold(0u64, |acc, &b| acc.checked_mul(256)?.checked_add(u64::from(b)));
    }

    let digits = field
        .iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| b != b' ' && b != 0);

    let mut value = 0u64;
    for &b in digits {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        value = value.checked_mul(8)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

pub(crate) fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Rounds `n` up to the next block boundary.
pub(crate) fn padded_len(n: u64) -> Option<u64> {
    n.checked_next_multiple_of(BLOCK_SIZE as u64)
}
