// Compression and checksum dispatch for string column payloads.

use std::io::Write;

use crate::error::{Error, Result};
use crate::types::{ChecksumKind, CompressionKind};

/// Compress `data` according to `kind`. `CompressionKind::None` returns the input unchanged.
pub fn compress(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Lz4 => {
            let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
            encoder.write_all(data).map_err(|e| Error::CompressionError {
                kind: "lz4",
                cause: e.to_string(),
            })?;
            encoder.finish().map_err(|e| Error::CompressionError {
                kind: "lz4",
                cause: e.to_string(),
            })
        }
        CompressionKind::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
            encoder.write_all(data).map_err(|e| Error::CompressionError {
                kind: "zlib",
                cause: e.to_string(),
            })?;
            encoder.finish().map_err(|e| Error::CompressionError {
                kind: "zlib",
                cause: e.to_string(),
            })
        }
        CompressionKind::Brotli => {
            let mut out = Vec::new();
            let params = brotli::enc::BrotliEncoderParams::default();
            brotli::BrotliCompress(&mut &data[..], &mut out, &params).map_err(|e| {
                Error::CompressionError {
                    kind: "brotli",
                    cause: e.to_string(),
                }
            })?;
            Ok(out)
        }
    }
}

/// Decompress `data`, previously produced by `compress` with the same `kind`.
pub fn decompress(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Lz4 => {
            use std::io::Read;
            let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::CompressionError {
                    kind: "lz4",
                    cause: e.to_string(),
                })?;
            Ok(out)
        }
        CompressionKind::Zlib => {
            use std::io::Read;
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::CompressionError {
                    kind: "zlib",
                    cause: e.to_string(),
                })?;
            Ok(out)
        }
        CompressionKind::Brotli => {
            use std::io::Read;
            let mut out = Vec::new();
            brotli::Decompressor::new(data, 4096)
                .read_to_end(&mut out)
                .map_err(|e| Error::CompressionError {
                    kind: "brotli",
                    cause: e.to_string(),
                })?;
            Ok(out)
        }
    }
}

/// Running checksum accumulator matching the incremental adler32/crc32 update used while
/// framing a row: bitmap bytes, then fixed area, then trailing payloads, in that order.
pub enum Checksum {
    None,
    Adler32(adler::Adler32),
    Crc32(crc32fast::Hasher),
}

impl Checksum {
    pub fn new(kind: ChecksumKind) -> Self {
        match kind {
            ChecksumKind::None => Checksum::None,
            ChecksumKind::Adler32 => Checksum::Adler32(adler::Adler32::new()),
            ChecksumKind::Crc32 => Checksum::Crc32(crc32fast::Hasher::new()),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Checksum::None => {}
            Checksum::Adler32(state) => state.write_slice(bytes),
            Checksum::Crc32(hasher) => hasher.update(bytes),
        }
    }

    /// Finalize to the trailing 4-byte value, or `None` if the checksum kind is `None`.
    pub fn finish(self) -> Option<u32> {
        match self {
            Checksum::None => None,
            Checksum::Adler32(state) => Some(state.checksum()),
            Checksum::Crc32(hasher) => Some(hasher.finalize()),
        }
    }
}
