// Boundary and literal-scenario tests for flatfile: the concrete examples spelled out for
// row framing, nullability, checksums, and append, each exercised end to end.

use flatfile::error::Error;
use flatfile::schema::Schema;
use flatfile::stream::{Reader, Writer};
use flatfile::types::{ChecksumKind, ColumnType, CompressionKind, Value};
use std::sync::Arc;
use test_log::test;

fn abcd_schema() -> Arc<Schema> {
    let mut s = Schema::new();
    s.add_column("a", ColumnType::String, true, None, CompressionKind::None)
        .unwrap();
    s.add_column("b", ColumnType::String, true, None, CompressionKind::Lz4)
        .unwrap();
    s.add_column("c", ColumnType::U32, false, None, CompressionKind::None)
        .unwrap();
    s.add_column("d", ColumnType::U64, false, None, CompressionKind::None)
        .unwrap();
    s.finalize().unwrap();
    Arc::new(s)
}

/// Scenario 1: all four columns present, round-trips exactly.
#[test]
fn scenario_all_columns_present_round_trips() {
    let schema = abcd_schema();
    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema.clone());
    w.write_row(&[
        Some(Value::String("aaaa".into())),
        Some(Value::String("bbbb".into())),
        Some(Value::U32(12345678)),
        Some(Value::U64(1122334455667788)),
    ])
    .unwrap();

    let mut r = Reader::new(&buf[..], schema);
    assert!(r.row_start().unwrap());
    assert_eq!(r.get_string(0).unwrap(), "aaaa");
    assert_eq!(r.get_string(1).unwrap(), "bbbb");
    assert_eq!(r.get_u32(2).unwrap(), 12345678);
    assert_eq!(r.get_u64(3).unwrap(), 1122334455667788);
}

/// Scenario 2: `b` omitted, reads back null; the other three columns are intact.
#[test]
fn scenario_omitted_nullable_column_reads_as_null() {
    let schema = abcd_schema();
    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema.clone());
    w.write_row(&[
        Some(Value::String("aaaa".into())),
        None,
        Some(Value::U32(12345678)),
        Some(Value::U64(1122334455667788)),
    ])
    .unwrap();

    let mut r = Reader::new(&buf[..], schema);
    assert!(r.row_start().unwrap());
    assert_eq!(r.get_string(0).unwrap(), "aaaa");
    assert!(r.is_null(1).unwrap());
    assert_eq!(r.get_u32(2).unwrap(), 12345678);
    assert_eq!(r.get_u64(3).unwrap(), 1122334455667788);
}

/// Scenario 3: empty strings round-trip with a zero-length payload (even when compressed).
#[test]
fn scenario_empty_strings_round_trip_with_zero_length_payloads() {
    let mut s = Schema::new();
    s.add_column("k", ColumnType::String, false, None, CompressionKind::None)
        .unwrap();
    s.add_column("v", ColumnType::String, false, None, CompressionKind::Lz4)
        .unwrap();
    s.finalize().unwrap();
    let schema = Arc::new(s);

    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema.clone());
    w.write_row(&[
        Some(Value::String(String::new())),
        Some(Value::String(String::new())),
    ])
    .unwrap();

    let mut r = Reader::new(&buf[..], schema);
    assert!(r.row_start().unwrap());
    assert_eq!(r.get_string(0).unwrap(), "");
    assert_eq!(r.get_string(1).unwrap(), "");
}

/// Scenario 4: write then append, reading back both rows in order.
#[test]
fn scenario_append_then_read_back_in_order() {
    let mut s = Schema::new();
    s.add_column("a", ColumnType::U32, false, None, CompressionKind::None)
        .unwrap();
    s.add_column("b", ColumnType::U32, false, None, CompressionKind::None)
        .unwrap();
    s.add_column("c", ColumnType::U32, true, None, CompressionKind::None)
        .unwrap();
    s.add_column("d", ColumnType::U64, true, None, CompressionKind::None)
        .unwrap();
    s.add_column("e", ColumnType::String, true, None, CompressionKind::None)
        .unwrap();
    s.finalize().unwrap();
    let schema = Arc::new(s);

    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema.clone());
    w.write_row(&[
        Some(Value::U32(1)),
        Some(Value::U32(2)),
        None,
        Some(Value::U64(64)),
        Some(Value::String("hello".into())),
    ])
    .unwrap();
    w.write_row(&[
        Some(Value::U32(2)),
        Some(Value::U32(4)),
        Some(Value::U32(5)),
        None,
        Some(Value::String("world".into())),
    ])
    .unwrap();

    let mut r = Reader::new(&buf[..], schema);
    assert!(r.row_start().unwrap());
    assert_eq!(r.get_u32(0).unwrap(), 1);
    assert!(r.is_null(2).unwrap());
    assert_eq!(r.get_u64(3).unwrap(), 64);
    assert_eq!(r.get_string(4).unwrap(), "hello");
    r.row_end().unwrap();

    assert!(r.row_start().unwrap());
    assert_eq!(r.get_u32(0).unwrap(), 2);
    assert_eq!(r.get_u32(2).unwrap(), 5);
    assert!(r.is_null(3).unwrap());
    assert_eq!(r.get_string(4).unwrap(), "world");
    r.row_end().unwrap();

    assert!(!r.row_start().unwrap());
}

/// Scenario 6: corrupting one byte in row 2's fixed area fails only row 2.
#[test]
fn scenario_checksum_corruption_fails_only_the_corrupted_row() {
    let mut s = Schema::new();
    s.add_column("c", ColumnType::U32, false, None, CompressionKind::None)
        .unwrap();
    s.set_checksum(ChecksumKind::Adler32).unwrap();
    s.finalize().unwrap();
    let schema = Arc::new(s);

    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema.clone());
    w.write_row(&[Some(Value::U32(1))]).unwrap();
    w.write_row(&[Some(Value::U32(2))]).unwrap();

    // Each frame is bitmap(1) + fixed(4) + checksum(4) = 9 bytes.
    let row2_fixed_offset = 9 + 1;
    buf[row2_fixed_offset] ^= 0xFF;

    let mut r = Reader::new(&buf[..], schema);
    assert!(r.row_start().unwrap());
    assert_eq!(r.get_u32(0).unwrap(), 1);
    r.row_end().unwrap();

    let err = r.row_start().unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch { .. }));
}

/// Zero bytes at a row boundary is a clean EOF, not an error.
#[test]
fn clean_eof_is_not_an_error() {
    let schema = abcd_schema();
    let mut r = Reader::new(&b""[..], schema);
    assert!(!r.row_start().unwrap());
}

/// Partial bytes at a row boundary is `TruncatedFile`.
#[test]
fn partial_bitmap_is_truncated_file() {
    let mut s = Schema::new();
    for n in 0..10 {
        s.add_column(
            &format!("c{n}"),
            ColumnType::U32,
            true,
            None,
            CompressionKind::None,
        )
        .unwrap();
    }
    s.finalize().unwrap();
    let schema = Arc::new(s);
    assert_eq!(schema.header_width(), 4);

    let mut r = Reader::new(&b"\x01\x00"[..], schema);
    let err = r.row_start().unwrap_err();
    assert!(matches!(err, Error::TruncatedFile));
}

/// Writing a value for a non-nullable column is required; omitting it fails at write time.
#[test]
fn missing_non_nullable_column_fails_at_write() {
    let schema = abcd_schema();
    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema);
    let err = w
        .write_row(&[
            Some(Value::String("a".into())),
            Some(Value::String("b".into())),
            None,
            Some(Value::U64(1)),
        ])
        .unwrap_err();
    assert!(matches!(err, Error::NullOnNonNullable { .. }));
    // The row was discarded; nothing should have been written to the stream.
    assert!(buf.is_empty());
}

/// Writing a column not declared in the schema fails with `UnknownColumn` and aborts the row.
#[test]
fn unknown_column_aborts_the_row() {
    let schema = abcd_schema();
    let mut buf = Vec::new();
    let mut w = Writer::new(&mut buf, schema);
    w.row_start().unwrap();
    let err = w.set_u32(99, 1).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn { .. }));
}
