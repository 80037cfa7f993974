//! Derived tables and their persistence.

use std::fs;
use std::io::Write;
use std::path::Path;

use aa_common::{Dekad, DekadRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;
use crate::schema::ColumnSchema;

/// A single value in a derived table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Missing,
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

/// One row: one feature for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub year: i32,
    pub dekad: u8,
    pub date: NaiveDate,
    /// Values in schema order.
    pub values: Vec<Cell>,
}

impl Row {
    pub fn new(period: Dekad, values: Vec<Cell>) -> Self {
        Self {
            year: period.year(),
            dekad: period.dekad(),
            date: period.to_date(),
            values,
        }
    }

    /// The row's period. Rows read from disk may carry an invalid dekad.
    pub fn period(&self) -> Result<Dekad> {
        Ok(Dekad::new(self.year, self.dekad)?)
    }

    fn sort_key(&self) -> (i32, u8) {
        (self.year, self.dekad)
    }
}

/// Persistent per-period table with an explicit trailing schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedTable {
    pub schema: ColumnSchema,
    pub rows: Vec<Row>,
}

impl DerivedTable {
    pub fn new(schema: ColumnSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_period(&self, period: &Dekad) -> bool {
        self.rows
            .iter()
            .any(|r| r.year == period.year() && r.dekad == period.dekad())
    }

    /// Number of rows whose period falls inside `range`.
    pub fn rows_in_range(&self, range: &DekadRange) -> usize {
        self.rows.iter().filter(|r| in_range(r, range)).count()
    }

    /// Drop the rows of one period.
    pub fn remove_period(&mut self, period: &Dekad) {
        self.rows
            .retain(|r| !(r.year == period.year() && r.dekad == period.dekad()));
    }

    /// Keep only rows inside `range`.
    pub fn retain_range(&mut self, range: &DekadRange) {
        self.rows.retain(|r| in_range(r, range));
    }

    /// Stable sort by period; rows of one period keep their order.
    pub fn sort_by_period(&mut self) {
        self.rows.sort_by_key(Row::sort_key);
    }
}

fn in_range(row: &Row, range: &DekadRange) -> bool {
    row.period().map(|p| range.contains(&p)).unwrap_or(false)
}

/// Storage backend for derived tables.
pub trait TableStore {
    /// Read a table, `None` if nothing is stored at `path`.
    fn read(&self, path: &Path) -> Result<Option<DerivedTable>>;

    /// Replace the table at `path`; readers never see a partial write.
    fn write(&self, path: &Path, table: &DerivedTable) -> Result<()>;
}

/// Tables stored as pretty-printed JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableStore;

impl TableStore for JsonTableStore {
    fn read(&self, path: &Path) -> Result<Option<DerivedTable>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write(&self, path: &Path, table: &DerivedTable) -> Result<()> {
        write_json_atomic(path, table)?;
        debug!(path = %path.display(), rows = table.len(), "Wrote derived table");
        Ok(())
    }
}

/// Serialize `value` to a temporary sibling of `path`, then rename it over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(value)?)
}

/// Write `bytes` to a temporary sibling of `path`, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
