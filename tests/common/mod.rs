// Test utilities and generators for flatfile property-based testing

#![allow(dead_code)]

use std::sync::Arc;

use flatfile::schema::Schema;
use flatfile::types::{ChecksumKind, ColumnType, CompressionKind, Value};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;

/// Per-column shape used to build both a `Schema` and matching row values.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub column_type: ColumnType,
    pub nullable: bool,
    pub compression: CompressionKind,
}

pub fn arb_checksum() -> impl Strategy<Value = ChecksumKind> {
    prop_oneof![
        Just(ChecksumKind::None),
        Just(ChecksumKind::Adler32),
        Just(ChecksumKind::Crc32),
    ]
}

pub fn arb_compression() -> impl Strategy<Value = CompressionKind> {
    prop_oneof![
        Just(CompressionKind::None),
        Just(CompressionKind::Lz4),
        Just(CompressionKind::Zlib),
        Just(CompressionKind::Brotli),
    ]
}

/// `u128` is excluded: its read path is reserved (`Error::UnsupportedType`), so it is not
/// round-trippable and has no place in a round-trip generator.
pub fn arb_column_spec() -> impl Strategy<Value = ColumnSpec> {
    (
        prop_oneof![
            Just(ColumnType::U32),
            Just(ColumnType::U64),
            Just(ColumnType::String),
        ],
        any::<bool>(),
    )
        .prop_flat_map(|(column_type, nullable)| {
            if column_type == ColumnType::String {
                arb_compression()
                    .prop_map(move |compression| ColumnSpec {
                        column_type,
                        nullable,
                        compression,
                    })
                    .boxed()
            } else {
                Just(ColumnSpec {
                    column_type,
                    nullable,
                    compression: CompressionKind::None,
                })
                .boxed()
            }
        })
}

/// A finalized schema together with the column specs that produced it, so a test can also
/// generate rows shaped for it.
pub fn arb_schema() -> impl Strategy<Value = (Arc<Schema>, Vec<ColumnSpec>)> {
    (prop::collection::vec(arb_column_spec(), 1..6), arb_checksum()).prop_map(
        |(specs, checksum)| {
            let mut schema = Schema::new();
            for (i, spec) in specs.iter().enumerate() {
                schema
                    .add_column(
                        &format!("c{i}"),
                        spec.column_type,
                        spec.nullable,
                        None,
                        spec.compression,
                    )
                    .unwrap();
            }
            schema.set_checksum(checksum).unwrap();
            schema.finalize().unwrap();
            (Arc::new(schema), specs)
        },
    )
}

fn arb_value_for(column_type: ColumnType) -> BoxedStrategy<Value> {
    match column_type {
        ColumnType::U32 => any::<u32>().prop_map(Value::U32).boxed(),
        ColumnType::U64 => any::<u64>().prop_map(Value::U64).boxed(),
        ColumnType::U128 => any::<u64>().prop_map(|v| Value::U128(v as u128)).boxed(),
        // Includes empty strings and multi-byte UTF-8.
        ColumnType::String => "[\\PC]{0,40}".prop_map(Value::String).boxed(),
    }
}

/// Rows shaped for `specs`: nullable columns are sometimes `None`, non-nullable columns
/// always `Some`.
pub fn arb_row_for(specs: &[ColumnSpec]) -> BoxedStrategy<Vec<Option<Value>>> {
    specs.iter().fold(Just(Vec::new()).boxed(), |acc, spec| {
        let value = arb_value_for(spec.column_type);
        let item: BoxedStrategy<Option<Value>> = if spec.nullable {
            prop_oneof![Just(None), value.prop_map(Some)].boxed()
        } else {
            value.prop_map(Some).boxed()
        };
        (acc, item)
            .prop_map(|(mut row, v)| {
                row.push(v);
                row
            })
            .boxed()
    })
}

/// A schema paired with a single row generated to match it.
pub fn arb_schema_and_row() -> impl Strategy<Value = (Arc<Schema>, Vec<Option<Value>>)> {
    arb_schema().prop_flat_map(|(schema, specs)| {
        arb_row_for(&specs).prop_map(move |row| (schema.clone(), row))
    })
}

/// A schema paired with `n` rows, each generated to match it.
pub fn arb_schema_and_rows(n: usize) -> impl Strategy<Value = (Arc<Schema>, Vec<Vec<Option<Value>>>)> {
    arb_schema().prop_flat_map(move |(schema, specs)| {
        prop::collection::vec(arb_row_for(&specs), n).prop_map(move |rows| (schema.clone(), rows))
    })
}
