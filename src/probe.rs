//! Size and dimension probing from a partial byte stream.
//!
//! The body is consumed in 1024-byte chunks and the accumulated prefix is
//! handed to the `image` header decoders after every chunk. Reading stops as
//! soon as the dimensions are known, the format turns out to be undecodable,
//! [`MAX_HEADER_BYTES`] have been read, or the stream ends.

use std::io::{Cursor, ErrorKind, Read};

use image::{ImageError, ImageReader};

use crate::domain::Dimensions;
use crate::error::HarvestError;

pub const PROBE_CHUNK_SIZE: usize = 1024;

/// Upper bound on the prefix kept in memory while looking for a header.
pub const MAX_HEADER_BYTES: usize = 256 * PROBE_CHUNK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProbeResult {
    pub size_bytes: Option<u64>,
    pub dimensions: Option<Dimensions>,
}

impl ProbeResult {
    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes.map(|bytes| bytes as f64 / 1e6)
    }
}

/// Outcome of parsing a prefix of an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScan {
    Found(Dimensions),
    /// The format is known and decodable but the header is not complete yet.
    Incomplete,
    /// No format could be guessed, or this build has no decoder for it.
    Undecodable,
}

pub fn probe_stream<R: Read>(
    content_length: Option<u64>,
    mut reader: R,
) -> Result<ProbeResult, HarvestError> {
    let mut prefix = Vec::with_capacity(PROBE_CHUNK_SIZE);
    let mut chunk = [0u8; PROBE_CHUNK_SIZE];
    let mut dimensions = None;
    loop {
        let filled = read_chunk(&mut reader, &mut chunk)
            .map_err(|err| HarvestError::ImageHttp(err.to_string()))?;
        if filled == 0 {
            tracing::debug!(bytes = prefix.len(), "stream ended before image header");
            break;
        }
        prefix.extend_from_slice(&chunk[..filled]);
        match scan_header(&prefix) {
            HeaderScan::Found(found) => {
                dimensions = Some(found);
                break;
            }
            HeaderScan::Undecodable => {
                tracing::debug!(bytes = prefix.len(), "undecodable image header");
                break;
            }
            HeaderScan::Incomplete if prefix.len() >= MAX_HEADER_BYTES => {
                tracing::debug!(bytes = prefix.len(), "image header not found within limit");
                break;
            }
            HeaderScan::Incomplete if filled < PROBE_CHUNK_SIZE => break,
            HeaderScan::Incomplete => {}
        }
    }
    Ok(ProbeResult {
        size_bytes: content_length,
        dimensions,
    })
}

pub fn scan_header(prefix: &[u8]) -> HeaderScan {
    let Ok(reader) = ImageReader::new(Cursor::new(prefix)).with_guessed_format() else {
        return HeaderScan::Undecodable;
    };
    if reader.format().is_none() {
        return HeaderScan::Undecodable;
    }
    match reader.into_dimensions() {
        Ok((width, height)) => HeaderScan::Found(Dimensions { width, height }),
        Err(ImageError::Unsupported(_)) => HeaderScan::Undecodable,
        Err(_) => HeaderScan::Incomplete,
    }
}

/// Dimensions from a (possibly truncated) encoded image, if its header is complete.
pub fn header_dimensions(prefix: &[u8]) -> Option<Dimensions> {
    match scan_header(prefix) {
        HeaderScan::Found(dimensions) => Some(dimensions),
        HeaderScan::Incomplete | HeaderScan::Undecodable => None,
    }
}

// Fills `chunk` unless the stream ends first; short reads from the transport are retried.
fn read_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        match reader.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
