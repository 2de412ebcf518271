// Schema: an ordered, eventually-immutable list of columns plus a checksum choice.

use std::collections::HashMap;

use crate::error::{Error, Result, SchemaMismatchReason};
use crate::types::{ChecksumKind, ColumnType, CompressionKind};

/// Largest column count the presence bitmap's header-width classes can address: `header_bytes`
/// tops out at 8 (the 5..=8 class), i.e. 64 presence bits.
pub const MAX_COLUMNS: usize = 64;

/// One column's static description.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub meaning: Option<String>,
    pub compression: CompressionKind,
    /// Byte offset within the fixed area. Only meaningful after `Schema::finalize`.
    pub fixed_offset: usize,
    /// Position in which this column was originally declared via `add_column`, independent
    /// of any reorder applied at `finalize`. Used to render schema-text in declaration order.
    pub declared_index: usize,
}

/// An ordered list of columns and a file-level checksum choice.
///
/// Mutable via `add_column`/`set_checksum` until `finalize` is called, after which the
/// layout (`header_bytes`, each column's `fixed_offset`) is frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    checksum: ChecksumKind,
    reorder: bool,
    header_bytes: usize,
    finalized: bool,
    name_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            columns: Vec::new(),
            checksum: ChecksumKind::None,
            reorder: false,
            header_bytes: 0,
            finalized: false,
            name_index: HashMap::new(),
        }
    }

    pub fn add_column(
        &mut self,
        name: &str,
        column_type: ColumnType,
        nullable: bool,
        meaning: Option<String>,
        compression: CompressionKind,
    ) -> Result<()> {
        if self.finalized {
            return Err(Error::SchemaFinalized);
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::DuplicateColumn {
                name: name.to_string(),
            });
        }
        if compression != CompressionKind::None && column_type != ColumnType::String {
            return Err(Error::CompressionOnNonString);
        }
        let declared_index = self.columns.len();
        self.columns.push(Column {
            name: name.to_string(),
            column_type,
            nullable,
            meaning,
            compression,
            fixed_offset: 0,
            declared_index,
        });
        Ok(())
    }

    pub fn set_checksum(&mut self, kind: ChecksumKind) -> Result<()> {
        if self.finalized {
            return Err(Error::SchemaFinalized);
        }
        self.checksum = kind;
        Ok(())
    }

    /// Mark the deprecated reorder flag. Only retained so existing schema-text describing
    /// `reorder=true` files can still be parsed; new schemas must not set it.
    pub fn set_reorder(&mut self, reorder: bool) -> Result<()> {
        if self.finalized {
            return Err(Error::SchemaFinalized);
        }
        self.reorder = reorder;
        Ok(())
    }

    /// Compute `header_bytes` and each column's `fixed_offset`, and freeze the schema.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::SchemaFinalized);
        }
        if self.columns.len() > MAX_COLUMNS {
            return Err(Error::TooManyColumns {
                count: self.columns.len(),
                max: MAX_COLUMNS,
            });
        }
        if self.reorder {
            let (mut strings, mut nonstrings): (Vec<Column>, Vec<Column>) = self
                .columns
                .drain(..)
                .partition(|c| c.column_type == ColumnType::String);
            strings.sort_by(|a, b| a.name.cmp(&b.name));
            nonstrings.sort_by(|a, b| a.name.cmp(&b.name));
            nonstrings.extend(strings);
            self.columns = nonstrings;
        }

        self.header_bytes = (self.columns.len() + 7) / 8;

        let mut offset = 0usize;
        for c in &mut self.columns {
            c.fixed_offset = offset;
            offset += c.column_type.fixed_width();
        }

        self.name_index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        self.finalized = true;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn checksum(&self) -> ChecksumKind {
        self.checksum
    }

    pub fn reorder(&self) -> bool {
        self.reorder
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns in the order they were originally declared via `add_column`, independent of
    /// the physical layout order `finalize` may have chosen under the deprecated reorder flag.
    pub fn columns_in_declared_order(&self) -> Vec<&Column> {
        let mut ordered: Vec<&Column> = self.columns.iter().collect();
        ordered.sort_by_key(|c| c.declared_index);
        ordered
    }

    /// Number of header bytes the presence bitmap occupies per §3's invariants, before the
    /// class-collapsing applied when it is actually emitted on the wire (see `header_width`).
    pub fn header_bytes(&self) -> usize {
        self.header_bytes
    }

    /// The emitted width, in bytes, of the presence bitmap on the wire.
    ///
    /// 0 columns -> 0 bytes, 1 -> 1, 2 -> 2, 3 or 4 -> 4, 5..=8 -> 8. Schemas needing more
    /// than 64 columns are outside this format's representable range.
    pub fn header_width(&self) -> usize {
        match self.header_bytes {
            0 => 0,
            1 => 1,
            2 => 2,
            3 | 4 => 4,
            _ => 8,
        }
    }

    /// The total size, in bytes, of the fixed area for a row where every column is present.
    pub fn max_fixed_area_size(&self) -> usize {
        self.columns.iter().map(|c| c.column_type.fixed_width()).sum()
    }

    /// Compare this schema against `other` column-by-column, failing on the first
    /// discrepancy in length, name, type, or nullability (in that priority order).
    pub fn matches(&self, other: &Schema) -> Result<()> {
        if self.columns.len() != other.columns.len() {
            return Err(Error::SchemaMismatch {
                reason: SchemaMismatchReason::Length,
            });
        }
        for (a, b) in self.columns.iter().zip(other.columns.iter()) {
            if a.name != b.name {
                return Err(Error::SchemaMismatch {
                    reason: SchemaMismatchReason::Name,
                });
            }
            if a.column_type != b.column_type {
                return Err(Error::SchemaMismatch {
                    reason: SchemaMismatchReason::Type,
                });
            }
            if a.nullable != b.nullable {
                return Err(Error::SchemaMismatch {
                    reason: SchemaMismatchReason::Nullable,
                });
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::new()
    }
}
