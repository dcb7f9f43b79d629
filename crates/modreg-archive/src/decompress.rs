//! Gzip inflation into an in-memory buffer.

use std::io::{ErrorKind, Read};

use flate2::read::GzDecoder;
use tracing::trace;

use crate::error::{ArchiveError, Result};

/// Initial output guess as a multiple of the compressed size. Source
/// tarballs typically compress 5-10x.
pub const SIZE_GUESS_FACTOR: usize = 9;

/// Inflates a gzip stream into raw bytes.
///
/// The output buffer starts at [`SIZE_GUESS_FACTOR`] times the input length.
/// Whenever the decoder fills it, the buffer grows by one input length and
/// inflation continues where it stopped. On success the buffer is truncated
/// to the exact decompressed length.
///
/// # Errors
///
/// * [`ArchiveError::EmptyInput`] if `gzip_bytes` is empty.
/// * [`ArchiveError::Decode`] if the stream is corrupt, truncated or fails
///   its CRC check. No partial output is returned in that case.
pub fn decompress(gzip_bytes: &[u8]) -> Result<Vec<u8>> {
    if gzip_bytes.is_empty() {
        return Err(ArchiveError::EmptyInput);
    }

    let step = gzip_bytes.len();
    let mut output = vec![0u8; step.saturating_mul(SIZE_GUESS_FACTOR)];
    let mut decoder = GzDecoder::new(gzip_bytes);
    let mut filled = 0;
    let mut growths = 0usize;

    loop {
        if filled == output.len() {
            let grown = output.len().saturating_add(step);
            output.resize(grown, 0);
            growths += 1;
            trace!(size = grown, growths, "growing decompression buffer");
        }

        match decoder.read(&mut output[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(ArchiveError::Decode { source }),
        }
    }

    output.truncate(filled);
    trace!(
        compressed = gzip_bytes.len(),
        decompressed = filled,
        growths,
        "decompressed archive"
    );

    Ok(output)
}
