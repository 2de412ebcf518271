// Stream writer and reader: the Idle/InRow state machines that drive `crate::row` against a
// `Read`/`Write` handle, plus the file-backed constructors (create/append/open) that add
// sidecar schema persistence on top of the generic, handle-agnostic core.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compression::Checksum;
use crate::error::{Error, Result};
use crate::row::{self, DecodedRow, StagedRow};
use crate::schema::Schema;
use crate::schema_text;
use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InRow,
}

/// Suffix appended to a data file's path to name its sidecar schema-text file.
const SIDECAR_SUFFIX: &str = ".schema";

fn sidecar_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn write_sidecar(data_path: &Path, schema: &Schema) -> Result<()> {
    std::fs::write(sidecar_path(data_path), schema.to_text())?;
    Ok(())
}

fn read_sidecar(data_path: &Path) -> Result<Schema> {
    let path = sidecar_path(data_path);
    let text = std::fs::read_to_string(&path).map_err(|_| Error::OpenError {
        path: path.display().to_string(),
    })?;
    schema_text::parse(&text)
}

/// Generic row-level writer over any `Write` handle. Buffers one row at a time in memory and
/// only touches the underlying stream on `row_end`, so a writer dropped mid-row leaves no
/// partial-row bytes behind.
pub struct Writer<W: Write> {
    inner: W,
    schema: Arc<Schema>,
    state: State,
    staged: StagedRow,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W, schema: Arc<Schema>) -> Self {
        Writer {
            inner,
            schema,
            state: State::Idle,
            staged: StagedRow::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn row_start(&mut self) -> Result<()> {
        if self.state != State::Idle {
            tracing::debug!("writer row_start called outside Idle state");
            return Err(Error::WriterStateError);
        }
        self.staged.clear();
        self.state = State::InRow;
        Ok(())
    }

    fn require_in_row(&self) -> Result<()> {
        if self.state != State::InRow {
            return Err(Error::WriterStateError);
        }
        Ok(())
    }

    fn column_index(&self, index: usize) -> Result<()> {
        if self.schema.column(index).is_none() {
            return Err(Error::UnknownColumn {
                name: format!("#{index}"),
            });
        }
        Ok(())
    }

    pub fn set_u32(&mut self, index: usize, value: u32) -> Result<()> {
        self.require_in_row()?;
        self.column_index(index)?;
        self.staged.set(index, Value::U32(value));
        Ok(())
    }

    pub fn set_u64(&mut self, index: usize, value: u64) -> Result<()> {
        self.require_in_row()?;
        self.column_index(index)?;
        self.staged.set(index, Value::U64(value));
        Ok(())
    }

    pub fn set_u128(&mut self, index: usize, value: u128) -> Result<()> {
        self.require_in_row()?;
        self.column_index(index)?;
        self.staged.set(index, Value::U128(value));
        Ok(())
    }

    pub fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        self.require_in_row()?;
        self.column_index(index)?;
        self.staged.set(index, Value::String(value.into()));
        Ok(())
    }

    fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        match value {
            Value::U32(v) => self.set_u32(index, v),
            Value::U64(v) => self.set_u64(index, v),
            Value::U128(v) => self.set_u128(index, v),
            Value::String(v) => self.set_string(index, v),
        }
    }

    /// Abandon the row currently staged, discarding it and returning to `Idle` without
    /// touching the underlying stream.
    fn abort_row(&mut self) {
        self.staged.clear();
        self.state = State::Idle;
    }

    pub fn row_end(&mut self) -> Result<()> {
        self.require_in_row()?;
        let result = row::encode_row(&self.schema, &self.staged).and_then(|frame| {
            self.inner.write_all(&frame)?;
            self.inner.flush()?;
            Ok(())
        });
        if let Err(ref e) = result {
            tracing::debug!(error = %e, "row_end failed, discarding staged row");
        }
        self.staged.clear();
        self.state = State::Idle;
        result
    }

    /// Index-aligned positional write: `values[i] = None` leaves column `i` unset for this row.
    pub fn write_row(&mut self, values: &[Option<Value>]) -> Result<()> {
        self.row_start()?;
        for (i, v) in values.iter().enumerate() {
            if let Some(v) = v.clone() {
                if let Err(e) = self.set_value(i, v) {
                    self.abort_row();
                    return Err(e);
                }
            }
        }
        self.row_end()
    }

    /// Name-keyed write; keys absent from the schema fail with `UnknownColumn`.
    pub fn write_dict(&mut self, values: &HashMap<String, Value>) -> Result<()> {
        self.row_start()?;
        for (name, value) in values {
            let index = match self.schema.find(name) {
                Some(i) => i,
                None => {
                    self.abort_row();
                    return Err(Error::UnknownColumn { name: name.clone() });
                }
            };
            if let Err(e) = self.set_value(index, value.clone()) {
                self.abort_row();
                return Err(e);
            }
        }
        self.row_end()
    }

    /// Flush and release the underlying stream. Idempotent in the sense that calling it twice
    /// on an already-flushed writer is harmless; it consumes `self` so a second call is not
    /// possible on the same value.
    pub fn close(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Generic row-level reader over any `Read` handle.
pub struct Reader<R: Read> {
    inner: R,
    schema: Arc<Schema>,
    state: State,
    current: Option<DecodedRow>,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R, schema: Arc<Schema>) -> Self {
        Reader {
            inner,
            schema,
            state: State::Idle,
            current: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn clone_schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    /// Read and fully decode the next row. Returns `Ok(false)` at clean EOF, leaving the
    /// reader in `Idle`.
    pub fn row_start(&mut self) -> Result<bool> {
        if self.state != State::Idle {
            return Err(Error::WriterStateError);
        }

        let header_width = self.schema.header_width();
        let bitmap = match read_bitmap_or_eof(&mut self.inner, header_width)? {
            Some(b) => b,
            None => return Ok(false),
        };

        let fixed_len = row::fixed_area_len(&self.schema, &bitmap);
        let mut fixed = vec![0u8; fixed_len];
        read_full(&mut self.inner, &mut fixed)?;

        let string_lengths = row::string_payload_lengths(&self.schema, &bitmap, &fixed);
        let trailing_len: usize = string_lengths.iter().sum();
        let mut trailing = vec![0u8; trailing_len];
        read_full(&mut self.inner, &mut trailing)?;

        if self.schema.checksum() != crate::types::ChecksumKind::None {
            let mut expected_bytes = [0u8; 4];
            read_full(&mut self.inner, &mut expected_bytes)?;
            let expected = u32::from_le_bytes(expected_bytes);

            let mut checksum = Checksum::new(self.schema.checksum());
            checksum.update(&bitmap);
            checksum.update(&fixed);
            checksum.update(&trailing);
            let actual = checksum.finish().unwrap_or(0);
            if actual != expected {
                tracing::warn!(expected, actual, "row checksum mismatch");
                return Err(Error::ChecksumMismatch { expected, actual });
            }
        }

        let decoded = row::decode_row(&self.schema, &bitmap, &fixed, &trailing)?;
        self.current = Some(decoded);
        self.state = State::InRow;
        Ok(true)
    }

    fn current_row(&self) -> Result<&DecodedRow> {
        if self.state != State::InRow {
            return Err(Error::WriterStateError);
        }
        Ok(self.current.as_ref().expect("InRow implies current row set"))
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.current_row()?.is_null(index))
    }

    fn typed_value(&self, index: usize, expected: &'static str) -> Result<&Value> {
        let column = self.schema.column(index).ok_or_else(|| Error::UnknownColumn {
            name: format!("#{index}"),
        })?;
        let row = self.current_row()?;
        if row.is_null(index) {
            return Err(Error::ReaderTypeError {
                column: column.name.clone(),
                expected,
                got_type: "null",
            });
        }
        match row.value(index) {
            Some(v) => Ok(v),
            None => Err(Error::ReaderTypeError {
                column: column.name.clone(),
                expected,
                got_type: "null",
            }),
        }
    }

    pub fn get_u32(&self, index: usize) -> Result<u32> {
        match self.typed_value(index, "u32")? {
            Value::U32(v) => Ok(*v),
            other => Err(Error::ReaderTypeError {
                column: self.schema.column(index).unwrap().name.clone(),
                expected: "u32",
                got_type: other.type_name(),
            }),
        }
    }

    pub fn get_u64(&self, index: usize) -> Result<u64> {
        match self.typed_value(index, "u64")? {
            Value::U64(v) => Ok(*v),
            other => Err(Error::ReaderTypeError {
                column: self.schema.column(index).unwrap().name.clone(),
                expected: "u64",
                got_type: other.type_name(),
            }),
        }
    }

    /// Always fails: `u128` is a reserved, encode-only column type (see §9 open questions).
    pub fn get_u128(&self, _index: usize) -> Result<u128> {
        Err(Error::UnsupportedType { type_name: "u128" })
    }

    pub fn get_string(&self, index: usize) -> Result<&str> {
        match self.typed_value(index, "string")? {
            Value::String(v) => Ok(v.as_str()),
            other => Err(Error::ReaderTypeError {
                column: self.schema.column(index).unwrap().name.clone(),
                expected: "string",
                got_type: other.type_name(),
            }),
        }
    }

    pub fn row_end(&mut self) -> Result<()> {
        if self.state != State::InRow {
            return Err(Error::WriterStateError);
        }
        self.current = None;
        self.state = State::Idle;
        Ok(())
    }
}

/// Read `header_width` bytes, returning `Ok(None)` on a clean EOF (zero bytes available) and
/// `Err(TruncatedFile)` on a partial read. `header_width == 0` has no bitmap bytes to read and
/// so cannot observe EOF this way; such a stream is treated as always having a next row.
fn read_bitmap_or_eof<R: Read>(r: &mut R, header_width: usize) -> Result<Option<Vec<u8>>> {
    if header_width == 0 {
        return Ok(Some(Vec::new()));
    }
    let mut buf = vec![0u8; header_width];
    let mut read = 0usize;
    loop {
        match r.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => {
                read += n;
                if read == header_width {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if read == 0 {
        Ok(None)
    } else if read < header_width {
        Err(Error::TruncatedFile)
    } else {
        Ok(Some(buf))
    }
}

fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::TruncatedFile),
        Err(e) => Err(e.into()),
    }
}

/// File-backed writer. Adds sidecar schema persistence and an append/appender mode on top of
/// the generic `Writer`.
pub struct FileWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    rows_written: u64,
}

impl FileWriter {
    /// Create a new data file at `path`, truncating any existing contents.
    pub fn create(path: impl AsRef<Path>, schema: Arc<Schema>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(FileWriter {
            writer: Writer::new(BufWriter::new(file), schema),
            path,
            rows_written: 0,
        })
    }

    /// Open `path` for appending. If it exists and is non-empty, its sidecar schema is loaded
    /// and validated against `expected_schema`; otherwise a new file is created with
    /// `expected_schema`.
    pub fn append(path: impl AsRef<Path>, expected_schema: Arc<Schema>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        if existing_len > 0 {
            let file_schema = read_sidecar(&path)?;
            expected_schema.matches(&file_schema)?;
            let file = OpenOptions::new().append(true).open(&path)?;
            Ok(FileWriter {
                writer: Writer::new(BufWriter::new(file), Arc::new(file_schema)),
                path,
                rows_written: 0,
            })
        } else {
            let file = File::create(&path)?;
            Ok(FileWriter {
                writer: Writer::new(BufWriter::new(file), expected_schema),
                path,
                rows_written: 0,
            })
        }
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn row_start(&mut self) -> Result<()> {
        self.writer.row_start()
    }
    pub fn set_u32(&mut self, index: usize, value: u32) -> Result<()> {
        self.writer.set_u32(index, value)
    }
    pub fn set_u64(&mut self, index: usize, value: u64) -> Result<()> {
        self.writer.set_u64(index, value)
    }
    pub fn set_u128(&mut self, index: usize, value: u128) -> Result<()> {
        self.writer.set_u128(index, value)
    }
    pub fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        self.writer.set_string(index, value)
    }
    pub fn row_end(&mut self) -> Result<()> {
        self.writer.row_end()?;
        self.rows_written += 1;
        Ok(())
    }
    pub fn write_row(&mut self, values: &[Option<Value>]) -> Result<()> {
        self.writer.write_row(values)?;
        self.rows_written += 1;
        Ok(())
    }
    pub fn write_dict(&mut self, values: &HashMap<String, Value>) -> Result<()> {
        self.writer.write_dict(values)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Flush and persist the sidecar schema file.
    pub fn close(self) -> Result<()> {
        let schema = self.writer.schema().clone();
        self.writer.close()?;
        write_sidecar(&self.path, &schema)
    }

    /// Close, deleting the data file and its sidecar if no rows were ever written. Returns
    /// `true` if the file was deleted.
    pub fn close_if_empty(self) -> Result<bool> {
        if self.rows_written == 0 {
            let path = self.path.clone();
            self.writer.close()?;
            std::fs::remove_file(&path)?;
            let sidecar = sidecar_path(&path);
            if sidecar.exists() {
                std::fs::remove_file(sidecar)?;
            }
            Ok(true)
        } else {
            self.close()?;
            Ok(false)
        }
    }
}

/// File-backed reader. Loads (and optionally validates) the schema from the sidecar file.
pub struct FileReader {
    reader: Reader<BufReader<File>>,
}

impl FileReader {
    /// Open `path`. If `expected_schema` is `Some`, the file's sidecar schema is validated
    /// against it (`SchemaMismatch` on the first discrepancy); the file's own schema is always
    /// the one actually used to decode rows.
    pub fn open(path: impl AsRef<Path>, expected_schema: Option<&Schema>) -> Result<Self> {
        let path = path.as_ref();
        let file_schema = read_sidecar(path)?;
        if let Some(expected) = expected_schema {
            expected.matches(&file_schema)?;
        }
        let file = File::open(path).map_err(|_| Error::OpenError {
            path: path.display().to_string(),
        })?;
        Ok(FileReader {
            reader: Reader::new(BufReader::new(file), Arc::new(file_schema)),
        })
    }

    pub fn clone_schema(&self) -> Arc<Schema> {
        self.reader.clone_schema()
    }
    pub fn row_start(&mut self) -> Result<bool> {
        self.reader.row_start()
    }
    pub fn is_null(&self, index: usize) -> Result<bool> {
        self.reader.is_null(index)
    }
    pub fn get_u32(&self, index: usize) -> Result<u32> {
        self.reader.get_u32(index)
    }
    pub fn get_u64(&self, index: usize) -> Result<u64> {
        self.reader.get_u64(index)
    }
    pub fn get_u128(&self, index: usize) -> Result<u128> {
        self.reader.get_u128(index)
    }
    pub fn get_string(&self, index: usize) -> Result<&str> {
        self.reader.get_string(index)
    }
    pub fn row_end(&mut self) -> Result<()> {
        self.reader.row_end()
    }
}
