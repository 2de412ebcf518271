// Error types for flatfile

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a caller-supplied schema differs from the schema materialized from a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMismatchReason {
    Length,
    Name,
    Type,
    Nullable,
}

impl fmt::Display for SchemaMismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatchReason::Length => write!(f, "length"),
            SchemaMismatchReason::Name => write!(f, "name"),
            SchemaMismatchReason::Type => write!(f, "type"),
            SchemaMismatchReason::Nullable => write!(f, "nullable"),
        }
    }
}

/// All failure conditions surfaced by this crate.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    TruncatedFile,
    ChecksumMismatch { expected: u32, actual: u32 },
    SchemaMismatch { reason: SchemaMismatchReason },
    UnionSchemaMismatch { file: String },
    DuplicateColumn { name: String },
    UnknownColumn { name: String },
    InvalidType { token: String },
    InvalidCompression { token: String },
    InvalidChecksum { token: String },
    CompressionOnNonString,
    ValueOutOfRange { column: String, max: u128 },
    NullOnNonNullable { column: String },
    ReaderTypeError {
        column: String,
        expected: &'static str,
        got_type: &'static str,
    },
    WriterTypeError {
        column: String,
        expected: &'static str,
        got_type: &'static str,
    },
    WriterStateError,
    CompressionError { kind: &'static str, cause: String },
    InvalidUtf8 { column: String },
    OpenError { path: String },
    SchemaSyntaxError { line: String },
    UnsupportedType { type_name: &'static str },
    SchemaFinalized,
    TooManyColumns { count: usize, max: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::TruncatedFile => write!(f, "truncated file: partial row at end of stream"),
            Error::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch: expected {:#010x}, got {:#010x}",
                expected, actual
            ),
            Error::SchemaMismatch { reason } => {
                write!(f, "schema mismatch: {}", reason)
            }
            Error::UnionSchemaMismatch { file } => {
                write!(f, "union schema mismatch in file {}", file)
            }
            Error::DuplicateColumn { name } => write!(f, "duplicate column {}", name),
            Error::UnknownColumn { name } => write!(f, "unknown column {}", name),
            Error::InvalidType { token } => write!(f, "invalid column type {}", token),
            Error::InvalidCompression { token } => write!(f, "invalid compression {}", token),
            Error::InvalidChecksum { token } => write!(f, "invalid checksum {}", token),
            Error::CompressionOnNonString => {
                write!(f, "compression may only be set on string columns")
            }
            Error::ValueOutOfRange { column, max } => {
                write!(f, "value for column {} exceeds maximum {}", column, max)
            }
            Error::NullOnNonNullable { column } => {
                write!(f, "column {} is not nullable but was left unset", column)
            }
            Error::ReaderTypeError {
                column,
                expected,
                got_type,
            } => write!(
                f,
                "column {}: expected {} getter, column is {}",
                column, expected, got_type
            ),
            Error::WriterTypeError {
                column,
                expected,
                got_type,
            } => write!(
                f,
                "column {}: expected a {} value, got {}",
                column, expected, got_type
            ),
            Error::WriterStateError => write!(f, "writer is not in the expected state"),
            Error::CompressionError { kind, cause } => {
                write!(f, "compression error ({}): {}", kind, cause)
            }
            Error::InvalidUtf8 { column } => {
                write!(f, "column {} payload is not valid utf-8", column)
            }
            Error::OpenError { path } => write!(f, "unable to open {}", path),
            Error::SchemaSyntaxError { line } => write!(f, "schema syntax error: {}", line),
            Error::UnsupportedType { type_name } => {
                write!(f, "unsupported column type: {}", type_name)
            }
            Error::SchemaFinalized => write!(f, "schema is already finalized"),
            Error::TooManyColumns { count, max } => write!(
                f,
                "schema has {} columns, exceeding the maximum of {}",
                count, max
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
