//! Row-oriented binary flat-file codec.
//!
//! Records are framed as a presence bitmap, fixed-width slots, trailing variable-width string
//! payloads, and an optional checksum tail (`row`). Columns are typed and optionally
//! compressed and nullable (`schema`, `types`, `compression`). `stream` drives the row codec
//! against a file or any `Read`/`Write` handle and persists a schema-text sidecar so a later
//! reader can recover "the file's schema" without an in-band header. `schema_text` is the
//! textual schema grammar; `relation` evaluates a tiny single-file/glob-union expression into
//! one continuous row stream.
//!
//! The format is sequential-read only: no random row access, no in-place update, no
//! concurrent writers on one stream.

pub mod compression;
pub mod error;
pub mod relation;
pub mod row;
pub mod schema;
pub mod schema_text;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use relation::{Relation, RelationKind, RelationReader};
pub use schema::{Column, Schema};
pub use stream::{FileReader, FileWriter, Reader, Writer};
pub use types::{ChecksumKind, ColumnType, CompressionKind, Value};
