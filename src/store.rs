use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A row type persisted as one flat CSV table.
pub trait Record: Serialize + DeserializeOwned {
    /// Table name; the file stem for [`CsvStore`].
    const TABLE: &'static str;
    /// Exact header expected on read, in serialization order.
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table}: io error at {path}: {source}")]
    Io {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{table}: csv error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: schema mismatch, expected [{expected}] but found [{found}]")]
    Schema {
        table: &'static str,
        expected: String,
        found: String,
    },
}

/// Whole-table storage. Implementors only move bytes; encoding and schema
/// checks live in the provided methods so every backend shares them.
pub trait TableStore {
    /// Raw table contents, or `None` if the table has never been written.
    fn read_table(&self, table: &'static str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the whole table. Readers must see either the old or the new
    /// contents, never a mix.
    fn replace_table(&mut self, table: &'static str, bytes: Vec<u8>) -> Result<(), StoreError>;

    fn load<R: Record>(&self) -> Result<Vec<R>, StoreError>
    where
        Self: Sized,
    {
        match self.read_table(R::TABLE)? {
            Some(bytes) => decode_rows::<R>(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn save<R: Record>(&mut self, rows: &[R]) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let bytes = encode_rows(rows)?;
        self.replace_table(R::TABLE, bytes)
    }
}

pub fn decode_rows<R: Record>(bytes: &[u8]) -> Result<Vec<R>, StoreError> {
    let csv_err = |source| StoreError::Csv {
        table: R::TABLE,
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(csv_err)?.clone();
    // A zero-byte table has no header row.
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let found = headers.iter().collect::<Vec<_>>();
    if found != R::COLUMNS {
        return Err(StoreError::Schema {
            table: R::TABLE,
            expected: R::COLUMNS.join(","),
            found: found.join(","),
        });
    }

    let mut out = Vec::new();
    for row in reader.deserialize::<R>() {
        out.push(row.map_err(csv_err)?);
    }
    Ok(out)
}

pub fn encode_rows<R: Record>(rows: &[R]) -> Result<Vec<u8>, StoreError> {
    let csv_err = |source| StoreError::Csv {
        table: R::TABLE,
        source,
    };
    // Serde emits the header from the first row; an empty table still needs one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!rows.is_empty())
        .from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(R::COLUMNS).map_err(csv_err)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.into_inner().map_err(|err| StoreError::Csv {
        table: R::TABLE,
        source: err.into_error().into(),
    })
}

/// One directory of CSV files per season, e.g. `data/2023/fixture_data.csv`.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_season(data_dir: &Path, season: &str) -> Self {
        Self::new(data_dir.join(season))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }
}

impl TableStore for CsvStore {
    fn read_table(&self, table: &'static str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.table_path(table);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                table,
                path,
                source,
            }),
        }
    }

    fn replace_table(&mut self, table: &'static str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.table_path(table);
        let io_err = |path: &Path, source| StoreError::Io {
            table,
            path: path.to_path_buf(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let tmp = path.with_extension("csv.tmp");
        fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
        Ok(())
    }
}

/// In-memory tables using the same CSV encoding as [`CsvStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<&'static str, Vec<u8>>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &'static str, csv_text: &str) -> Self {
        self.tables.insert(table, csv_text.as_bytes().to_vec());
        self
    }

    pub fn table_text(&self, table: &str) -> Option<String> {
        self.tables
            .get(table)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of `replace_table` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TableStore for MemoryStore {
    fn read_table(&self, table: &'static str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.get(table).cloned())
    }

    fn replace_table(&mut self, table: &'static str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.tables.insert(table, bytes);
        self.writes += 1;
        Ok(())
    }
}
