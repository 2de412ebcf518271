// Row framing: presence bitmap, fixed area, trailing payloads, checksum tail.
//
// This module composes and parses a single row frame per the on-disk layout. It has no
// knowledge of streams or files; `crate::stream` drives it against a `Read`/`Write` handle.

use std::collections::HashMap;

use crate::compression::{self, Checksum};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::types::{ColumnType, Value};

/// A staged set of column values, keyed by column index, ready to be framed by `encode_row`.
///
/// Built by `crate::stream::Writer` as the caller calls `set_u32`/`set_string`/etc.
#[derive(Debug, Default)]
pub struct StagedRow {
    values: HashMap<usize, Value>,
}

impl StagedRow {
    pub fn new() -> Self {
        StagedRow {
            values: HashMap::new(),
        }
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.values.insert(index, value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(&index)
    }
}

/// Encode `row` against `schema` into a single row frame, returning the frame's bytes.
///
/// Validates nullability (`NullOnNonNullable`), value range (`ValueOutOfRange`), and that
/// each staged value's variant matches its column's declared type (`WriterTypeError`) before
/// emitting anything; on error no partial frame is returned to the caller.
pub fn encode_row(schema: &Schema, row: &StagedRow) -> Result<Vec<u8>> {
    let header_width = schema.header_width();
    let mut bitmap = vec![0u8; header_width];
    let mut fixed = Vec::with_capacity(schema.max_fixed_area_size());
    let mut trailing = Vec::new();

    for (i, column) in schema.columns().iter().enumerate() {
        let value = match row.get(i) {
            Some(v) => v,
            None => {
                if !column.nullable {
                    return Err(Error::NullOnNonNullable {
                        column: column.name.clone(),
                    });
                }
                continue;
            }
        };
        set_bit(&mut bitmap, i);

        match (column.column_type, value) {
            (ColumnType::U32, Value::U32(v)) => fixed.extend_from_slice(&v.to_le_bytes()),
            (ColumnType::U64, Value::U64(v)) => fixed.extend_from_slice(&v.to_le_bytes()),
            (ColumnType::U128, Value::U128(v)) => fixed.extend_from_slice(&v.to_le_bytes()),
            (ColumnType::String, Value::String(s)) => {
                let compressed = compression::compress(column.compression, s.as_bytes())?;
                if compressed.len() > u32::MAX as usize {
                    return Err(Error::ValueOutOfRange {
                        column: column.name.clone(),
                        max: u32::MAX as u128,
                    });
                }
                let len = compressed.len() as u32;
                fixed.extend_from_slice(&len.to_le_bytes());
                trailing.extend_from_slice(&compressed);
            }
            _ => {
                return Err(Error::WriterTypeError {
                    column: column.name.clone(),
                    expected: column.column_type.token(),
                    got_type: value.type_name(),
                })
            }
        }
    }

    let mut checksum = Checksum::new(schema.checksum());
    checksum.update(&bitmap);
    checksum.update(&fixed);
    checksum.update(&trailing);

    let mut frame = Vec::with_capacity(bitmap.len() + fixed.len() + trailing.len() + 4);
    frame.extend_from_slice(&bitmap);
    frame.extend_from_slice(&fixed);
    frame.extend_from_slice(&trailing);
    if let Some(sum) = checksum.finish() {
        frame.extend_from_slice(&sum.to_le_bytes());
    }
    Ok(frame)
}

/// A decoded row, holding the presence bitmap and the fully-parsed column values.
///
/// Built eagerly by `crate::stream::Reader::row_start` so that `get_*` accessors are O(1).
#[derive(Debug, Clone)]
pub struct DecodedRow {
    present: Vec<bool>,
    values: Vec<Option<Value>>,
}

impl DecodedRow {
    pub fn is_null(&self, index: usize) -> bool {
        !self.present.get(index).copied().unwrap_or(false)
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(|v| v.as_ref())
    }
}

/// Parse one row frame out of `bitmap`, `fixed`, and `trailing` slices (already read by the
/// caller, sized from `header_width`/`max_fixed_area_size`/the declared string lengths).
pub fn decode_row(schema: &Schema, bitmap: &[u8], fixed: &[u8], trailing: &[u8]) -> Result<DecodedRow> {
    let column_count = schema.column_count();
    let mut present = vec![false; column_count];
    for i in 0..column_count {
        present[i] = get_bit(bitmap, i);
    }

    let mut values = vec![None; column_count];
    let mut fixed_cursor = 0usize;
    let mut trailing_cursor = 0usize;

    for (i, column) in schema.columns().iter().enumerate() {
        if !present[i] {
            continue;
        }
        let width = column.column_type.fixed_width();
        let slot = &fixed[fixed_cursor..fixed_cursor + width];
        fixed_cursor += width;

        let value = match column.column_type {
            ColumnType::U32 => Value::U32(u32::from_le_bytes(slot.try_into().unwrap())),
            ColumnType::U64 => Value::U64(u64::from_le_bytes(slot.try_into().unwrap())),
            ColumnType::U128 => {
                return Err(Error::UnsupportedType {
                    type_name: "u128",
                })
            }
            ColumnType::String => {
                let len = u32::from_le_bytes(slot.try_into().unwrap()) as usize;
                let payload = &trailing[trailing_cursor..trailing_cursor + len];
                trailing_cursor += len;
                let decompressed = compression::decompress(column.compression, payload)?;
                let s = String::from_utf8(decompressed).map_err(|_| Error::InvalidUtf8 {
                    column: column.name.clone(),
                })?;
                Value::String(s)
            }
        };
        values[i] = Some(value);
    }

    Ok(DecodedRow { present, values })
}

/// Total byte length of the fixed area for the columns whose presence bit is set in `bitmap`.
pub fn fixed_area_len(schema: &Schema, bitmap: &[u8]) -> usize {
    schema
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| get_bit(bitmap, *i))
        .map(|(_, c)| c.column_type.fixed_width())
        .sum()
}

/// Declared trailing payload lengths for the present string columns, in ascending column order.
pub fn string_payload_lengths(schema: &Schema, bitmap: &[u8], fixed: &[u8]) -> Vec<usize> {
    let mut lengths = Vec::new();
    let mut cursor = 0usize;
    for (i, column) in schema.columns().iter().enumerate() {
        if !get_bit(bitmap, i) {
            continue;
        }
        let width = column.column_type.fixed_width();
        if column.column_type == ColumnType::String {
            let slot = &fixed[cursor..cursor + width];
            lengths.push(u32::from_le_bytes(slot.try_into().unwrap()) as usize);
        }
        cursor += width;
    }
    lengths
}

/// Panics if `index` falls outside `bitmap`; `Schema::finalize` rejects schemas with more
/// than `schema::MAX_COLUMNS` columns precisely so this can't happen for a finalized schema.
fn set_bit(bitmap: &mut [u8], index: usize) {
    let byte = index / 8;
    assert!(
        byte < bitmap.len(),
        "column index {index} out of range for a {}-byte presence bitmap",
        bitmap.len()
    );
    bitmap[byte] |= 1 << (index % 8);
}

fn get_bit(bitmap: &[u8], index: usize) -> bool {
    let byte = index / 8;
    if byte >= bitmap.len() {
        return false;
    }
    (bitmap[byte] >> (index % 8)) & 1 == 1
}
