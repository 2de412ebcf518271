// Core type vocabulary for flatfile: column types, compression and checksum kinds.

use crate::error::Error;

/// The wire type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    U32,
    U64,
    /// Fixed-width encode path only; the decode path is reserved (see `Error::UnsupportedType`).
    U128,
    String,
}

impl ColumnType {
    /// Width in bytes of this column's fixed-area slot.
    pub fn fixed_width(self) -> usize {
        match self {
            ColumnType::U32 => 4,
            ColumnType::U64 => 8,
            ColumnType::U128 => 16,
            // String slots hold a 4-byte payload length, not the payload itself.
            ColumnType::String => 4,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ColumnType::U32 => "u32",
            ColumnType::U64 => "u64",
            ColumnType::U128 => "u128",
            ColumnType::String => "string",
        }
    }

    pub fn parse(token: &str) -> Result<Self, Error> {
        match token {
            "u32" | "u32le" => Ok(ColumnType::U32),
            "u64" | "u64le" => Ok(ColumnType::U64),
            "u128" | "u128le" => Ok(ColumnType::U128),
            "string" => Ok(ColumnType::String),
            _ => Err(Error::InvalidType {
                token: token.to_string(),
            }),
        }
    }
}

/// Compression applied to a string column's trailing payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionKind {
    #[default]
    None,
    Lz4,
    Zlib,
    Brotli,
}

impl CompressionKind {
    pub fn token(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Zlib => "zlib",
            CompressionKind::Brotli => "brotli",
        }
    }

    pub fn parse(token: &str) -> Result<Self, Error> {
        match token {
            "none" => Ok(CompressionKind::None),
            "lz4" => Ok(CompressionKind::Lz4),
            "zlib" => Ok(CompressionKind::Zlib),
            "brotli" => Ok(CompressionKind::Brotli),
            _ => Err(Error::InvalidCompression {
                token: token.to_string(),
            }),
        }
    }
}

/// Row-frame checksum algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    #[default]
    None,
    /// RFC 1950 Adler-32, seeded at 1.
    Adler32,
    /// IEEE CRC-32 with the standard reflected seed.
    Crc32,
}

impl ChecksumKind {
    pub fn token(self) -> &'static str {
        match self {
            ChecksumKind::None => "none",
            ChecksumKind::Adler32 => "adler32",
            ChecksumKind::Crc32 => "crc32",
        }
    }

    pub fn parse(token: &str) -> Result<Self, Error> {
        match token {
            "none" => Ok(ChecksumKind::None),
            "adler32" => Ok(ChecksumKind::Adler32),
            "crc32" => Ok(ChecksumKind::Crc32),
            _ => Err(Error::InvalidChecksum {
                token: token.to_string(),
            }),
        }
    }
}

/// A logical column value, as staged by a writer or returned by a reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U32(u32),
    U64(u64),
    U128(u128),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::U128(_) => "u128",
            Value::String(_) => "string",
        }
    }
}
