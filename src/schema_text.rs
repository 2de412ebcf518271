// Line-oriented textual schema grammar: `parse` builds a Schema, `Schema::to_text` renders
// the inverse. Also the format used by the sidecar schema file (see `crate::stream`) and by
// relation definitions (`crate::relation`) to describe each member file's schema.
//
// Grammar, one statement per line:
//   column NAME TYPE [MEANING [COMPRESSION [nonnull]]]
//   checksum KIND
//   reorder
//
// `nonnull` is an extension on top of the legacy grammar (which carried no nullability token
// at all): without it every schema-text column would come back nullable=true on every
// round-trip, which silently breaks `SchemaMismatch{nullable}` detection for the sidecar
// schema file this crate writes next to every data file. See DESIGN.md.

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::{ChecksumKind, ColumnType, CompressionKind};

/// Parse a line-oriented schema description into a finalized `Schema`.
pub fn parse(text: &str) -> Result<Schema> {
    let mut schema = Schema::new();

    for raw_line in text.lines() {
        let line = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        match tokens.first().copied() {
            Some("column") => parse_column_line(&mut schema, line, &tokens)?,
            Some("checksum") => {
                let kind_token = tokens.get(1).ok_or_else(|| Error::SchemaSyntaxError {
                    line: line.to_string(),
                })?;
                schema.set_checksum(ChecksumKind::parse(kind_token)?)?;
            }
            Some("reorder") => {
                schema.set_reorder(true)?;
            }
            _ => {
                return Err(Error::SchemaSyntaxError {
                    line: line.to_string(),
                })
            }
        }
    }

    schema.finalize()?;
    Ok(schema)
}

fn parse_column_line(schema: &mut Schema, line: &str, tokens: &[&str]) -> Result<()> {
    if tokens.len() < 3 {
        return Err(Error::SchemaSyntaxError {
            line: line.to_string(),
        });
    }
    let name = tokens[1];
    let column_type = ColumnType::parse(tokens[2])?;
    let meaning = match tokens.get(3) {
        Some(&"_") | None => None,
        Some(token) => Some(token.to_string()),
    };
    let compression = match tokens.get(4) {
        Some(token) => CompressionKind::parse(token)?,
        None => CompressionKind::None,
    };
    let nullable = match tokens.get(5) {
        Some(&"nonnull") => false,
        Some(_) => {
            return Err(Error::SchemaSyntaxError {
                line: line.to_string(),
            })
        }
        None => true,
    };
    schema.add_column(name, column_type, nullable, meaning, compression)?;
    Ok(())
}

impl Schema {
    /// Render this schema back into the grammar `parse` accepts. Columns are emitted in
    /// declaration order (not the possibly-reordered physical layout order); the deprecated
    /// `reorder` flag is re-emitted as its own line so a round-tripped file still lays out
    /// identically on disk.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for column in self.columns_in_declared_order() {
            out.push_str("column ");
            out.push_str(&column.name);
            out.push(' ');
            out.push_str(column.column_type.token());
            let meaning = column.meaning.as_deref().unwrap_or("_");
            let needs_compression = column.compression != CompressionKind::None;
            let needs_nullable_token = !column.nullable;
            if meaning != "_" || needs_compression || needs_nullable_token {
                out.push(' ');
                out.push_str(meaning);
            }
            if needs_compression || needs_nullable_token {
                out.push(' ');
                out.push_str(column.compression.token());
            }
            if needs_nullable_token {
                out.push_str(" nonnull");
            }
            out.push('\n');
        }
        if self.checksum() != ChecksumKind::None {
            out.push_str("checksum ");
            out.push_str(self.checksum().token());
            out.push('\n');
        }
        if self.reorder() {
            out.push_str("reorder\n");
        }
        out
    }
}
