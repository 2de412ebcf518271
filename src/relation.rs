// Relation reader: evaluates the tiny `NAME = file "PATH"` / `NAME = union 'GLOB'` grammar
// into an ordered list of files, and presents them as one continuous row stream under a
// single schema.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::stream::FileReader;

/// What a relation expands to: one file, or a glob-matched set read in filename order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    File(PathBuf),
    Union(String),
}

/// A single parsed relation definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
}

/// Parse one relation definition: `NAME = file "PATH"` or `NAME = union 'GLOB'`.
pub fn parse(text: &str) -> Result<Relation> {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .ok_or_else(|| Error::SchemaSyntaxError {
            line: String::new(),
        })?;

    let eq_pos = line.find('=').ok_or_else(|| Error::SchemaSyntaxError {
        line: line.to_string(),
    })?;
    let name = line[..eq_pos].trim().to_string();
    let rest = line[eq_pos + 1..].trim();

    if let Some(quoted) = rest.strip_prefix("file ") {
        let path = unquote(quoted, '"', line)?;
        Ok(Relation {
            name,
            kind: RelationKind::File(PathBuf::from(path)),
        })
    } else if let Some(quoted) = rest.strip_prefix("union ") {
        let pattern = unquote(quoted, '\'', line)?;
        Ok(Relation {
            name,
            kind: RelationKind::Union(pattern),
        })
    } else {
        Err(Error::SchemaSyntaxError {
            line: line.to_string(),
        })
    }
}

fn unquote(s: &str, quote: char, line: &str) -> Result<String> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
        Ok(s[1..s.len() - 1].to_string())
    } else {
        Err(Error::SchemaSyntaxError {
            line: line.to_string(),
        })
    }
}

fn resolve_paths(relation: &Relation) -> Result<Vec<PathBuf>> {
    match &relation.kind {
        RelationKind::File(p) => Ok(vec![p.clone()]),
        RelationKind::Union(pattern) => {
            let mut paths: Vec<PathBuf> = glob::glob(pattern)
                .map_err(|e| Error::OpenError {
                    path: format!("{pattern}: {e}"),
                })?
                .filter_map(std::result::Result::ok)
                .collect();
            paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            Ok(paths)
        }
    }
}

/// A multi-file sequential reader over a relation's expanded file list, presenting them as
/// one continuous row stream under the first file's schema.
pub struct RelationReader {
    schema: Arc<Schema>,
    paths: Vec<PathBuf>,
    next_index: usize,
    current: Option<FileReader>,
}

impl RelationReader {
    /// Open `relation`, validating the first file's schema against `expected_schema` if given,
    /// and every subsequent file's schema against the first (`UnionSchemaMismatch` otherwise).
    pub fn open(relation: &Relation, expected_schema: Option<&Schema>) -> Result<Self> {
        let paths = resolve_paths(relation)?;
        if paths.is_empty() {
            return Err(Error::OpenError {
                path: relation.name.clone(),
            });
        }
        let first = FileReader::open(&paths[0], expected_schema)?;
        let schema = first.clone_schema();
        tracing::debug!(relation = %relation.name, files = paths.len(), "opened relation");
        Ok(RelationReader {
            schema,
            paths,
            next_index: 1,
            current: Some(first),
        })
    }

    pub fn clone_schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn advance(&mut self) -> Result<bool> {
        if self.next_index >= self.paths.len() {
            return Ok(false);
        }
        let path = self.paths[self.next_index].clone();
        self.next_index += 1;
        let reader = FileReader::open(&path, None)?;
        let peer_schema = reader.clone_schema();
        if self.schema.matches(&peer_schema).is_err() {
            tracing::warn!(file = %path.display(), "union member schema mismatch");
            return Err(Error::UnionSchemaMismatch {
                file: path.display().to_string(),
            });
        }
        self.current = Some(reader);
        Ok(true)
    }

    pub fn row_start(&mut self) -> Result<bool> {
        loop {
            match self.current.as_mut() {
                Some(reader) => {
                    if reader.row_start()? {
                        return Ok(true);
                    }
                    self.current = None;
                }
                None => {
                    if !self.advance()? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        self.active()?.is_null(index)
    }
    pub fn get_u32(&self, index: usize) -> Result<u32> {
        self.active()?.get_u32(index)
    }
    pub fn get_u64(&self, index: usize) -> Result<u64> {
        self.active()?.get_u64(index)
    }
    pub fn get_u128(&self, index: usize) -> Result<u128> {
        self.active()?.get_u128(index)
    }
    pub fn get_string(&self, index: usize) -> Result<&str> {
        self.active()?.get_string(index)
    }
    pub fn row_end(&mut self) -> Result<()> {
        self.current
            .as_mut()
            .ok_or(Error::WriterStateError)?
            .row_end()
    }

    fn active(&self) -> Result<&FileReader> {
        self.current.as_ref().ok_or(Error::WriterStateError)
    }
}

/// Combined options for the top-level relation-or-file reader constructor (§6): `filename`
/// is a plain data-file path, or a compound `"reldef-path:data-path"` naming a file holding
/// the relation text; `reldef` is relation text supplied inline instead.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions<'a> {
    pub filename: &'a str,
    pub schema: Option<&'a Schema>,
    pub reldef: Option<&'a str>,
}

/// Resolve `options` into an opened `RelationReader`, per the constructor rules in §6: an
/// inline `reldef` wins; otherwise a compound `filename` ("reldef-path:data-path") reads the
/// relation text from `reldef-path`; otherwise `filename` is treated as a single data file.
pub fn open(options: ReaderOptions) -> Result<RelationReader> {
    let reldef_text: String = if let Some(inline) = options.reldef {
        inline.to_string()
    } else if let Some((reldef_path, _data_path)) = options.filename.split_once(':') {
        std::fs::read_to_string(reldef_path).map_err(|_| Error::OpenError {
            path: reldef_path.to_string(),
        })?
    } else {
        format!("data = file \"{}\"\n", options.filename)
    };
    let relation = parse(&reldef_text)?;
    RelationReader::open(&relation, options.schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::FileWriter;
    use crate::types::{ColumnType, CompressionKind, Value};
    use tempfile::tempdir;
    use test_log::test;

    fn u32_schema() -> Arc<Schema> {
        let mut s = Schema::new();
        s.add_column("v", ColumnType::U32, false, None, CompressionKind::None)
            .unwrap();
        s.finalize().unwrap();
        Arc::new(s)
    }

    #[test]
    fn parses_file_relation() {
        let r = parse("data = file \"/tmp/foo.ff\"\n").unwrap();
        assert_eq!(r.name, "data");
        assert_eq!(r.kind, RelationKind::File(PathBuf::from("/tmp/foo.ff")));
    }

    #[test]
    fn parses_union_relation() {
        let r = parse("data = union '/tmp/*.ff'\n").unwrap();
        assert_eq!(r.name, "data");
        assert_eq!(r.kind, RelationKind::Union("/tmp/*.ff".to_string()));
    }

    #[test]
    fn rejects_malformed_relation_text() {
        assert!(parse("nonsense\n").is_err());
        assert!(parse("data = frobnicate x\n").is_err());
    }

    #[test]
    fn union_reads_all_files_in_filename_order() {
        let dir = tempdir().unwrap();
        let schema = u32_schema();

        let path_a = dir.path().join("part-000.ff");
        let mut w = FileWriter::create(&path_a, schema.clone()).unwrap();
        w.write_row(&[Some(Value::U32(1))]).unwrap();
        w.write_row(&[Some(Value::U32(2))]).unwrap();
        w.close().unwrap();

        let path_b = dir.path().join("part-001.ff");
        let mut w = FileWriter::create(&path_b, schema.clone()).unwrap();
        w.write_row(&[Some(Value::U32(3))]).unwrap();
        w.close().unwrap();

        let pattern = dir.path().join("part-*.ff").display().to_string();
        let relation = Relation {
            name: "data".to_string(),
            kind: RelationKind::Union(pattern),
        };
        let mut reader = RelationReader::open(&relation, None).unwrap();

        let mut values = Vec::new();
        while reader.row_start().unwrap() {
            values.push(reader.get_u32(0).unwrap());
            reader.row_end().unwrap();
        }
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn union_mismatch_names_offending_file() {
        let dir = tempdir().unwrap();
        let schema_a = u32_schema();
        let mut schema_b_builder = Schema::new();
        schema_b_builder
            .add_column("v", ColumnType::U64, false, None, CompressionKind::None)
            .unwrap();
        schema_b_builder.finalize().unwrap();
        let schema_b = Arc::new(schema_b_builder);

        let path_a = dir.path().join("part-000.ff");
        let mut w = FileWriter::create(&path_a, schema_a.clone()).unwrap();
        w.write_row(&[Some(Value::U32(1))]).unwrap();
        w.close().unwrap();

        let path_b = dir.path().join("part-001.ff");
        let mut w = FileWriter::create(&path_b, schema_b.clone()).unwrap();
        w.write_row(&[Some(Value::U64(2))]).unwrap();
        w.close().unwrap();

        let pattern = dir.path().join("part-*.ff").display().to_string();
        let relation = Relation {
            name: "data".to_string(),
            kind: RelationKind::Union(pattern),
        };
        let mut reader = RelationReader::open(&relation, None).unwrap();
        assert!(reader.row_start().unwrap());
        reader.row_end().unwrap();
        let err = reader.row_start().unwrap_err();
        match err {
            Error::UnionSchemaMismatch { file } => assert!(file.contains("part-001.ff")),
            other => panic!("expected UnionSchemaMismatch, got {other:?}"),
        }
    }
}
