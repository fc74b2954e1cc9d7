//! The tabular record source the batch runner reads from and writes back to.
//!
//! The store itself is an external collaborator; this module defines the
//! seam (`SourceTable`) and a file-backed implementation used by the runner
//! binary and the tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Attachment URLs; the runner uses the first one.
    Attachments(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub id: String,
    #[serde(default)]
    pub cells: HashMap<String, CellValue>,
}

impl TableRecord {
    pub fn cell(&self, field: &str) -> Option<&CellValue> {
        self.cells.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.cells.get(field) {
            Some(CellValue::Text(value)) if !value.is_empty() => Some(value),
            _ => None,
        }
    }
}

pub trait SourceTable {
    /// Create the field if it does not exist yet. Safe to call on every run.
    fn ensure_field(
        &self,
        name: &str,
        kind: FieldKind,
    ) -> impl std::future::Future<Output = Result<(), TableError>> + Send;

    fn records(&self) -> impl std::future::Future<Output = Result<Vec<TableRecord>, TableError>> + Send;

    fn write_cells(
        &self,
        record_id: &str,
        cells: Vec<(String, CellValue)>,
    ) -> impl std::future::Future<Output = Result<(), TableError>> + Send;

    /// Drop any cached record data.
    fn unload(&self);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldDef {
    name: String,
    kind: FieldKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TableDocument {
    #[serde(default)]
    fields: Vec<FieldDef>,
    #[serde(default)]
    records: Vec<TableRecord>,
}

/// A table persisted as one JSON document, cached in memory between calls.
pub struct JsonFileTable {
    path: PathBuf,
    cache: Mutex<Option<TableDocument>>,
}

impl JsonFileTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn load(&self) -> Result<TableDocument, TableError> {
        let mut cache = self.cache.lock().expect("table cache lock poisoned");
        if let Some(doc) = cache.as_ref() {
            return Ok(doc.clone());
        }
        let doc = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path)?;
            serde_json::from_str(&raw)?
        } else {
            TableDocument::default()
        };
        *cache = Some(doc.clone());
        Ok(doc)
    }

    fn store(&self, doc: TableDocument) -> Result<(), TableError> {
        let raw = serde_json::to_string_pretty(&doc)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        let mut cache = self.cache.lock().expect("table cache lock poisoned");
        *cache = Some(doc);
        Ok(())
    }
}

impl SourceTable for JsonFileTable {
    async fn ensure_field(&self, name: &str, kind: FieldKind) -> Result<(), TableError> {
        let mut doc = self.load()?;
        if doc.fields.iter().any(|f| f.name == name) {
            return Ok(());
        }
        doc.fields.push(FieldDef {
            name: name.to_string(),
            kind,
        });
        self.store(doc)
    }

    async fn records(&self) -> Result<Vec<TableRecord>, TableError> {
        Ok(self.load()?.records)
    }

    async fn write_cells(
        &self,
        record_id: &str,
        cells: Vec<(String, CellValue)>,
    ) -> Result<(), TableError> {
        let mut doc = self.load()?;
        let record = doc
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| TableError::UnknownRecord(record_id.to_string()))?;
        for (field, value) in cells {
            record.cells.insert(field, value);
        }
        self.store(doc)
    }

    fn unload(&self) {
        let mut cache = self.cache.lock().expect("table cache lock poisoned");
        *cache = None;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("table I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("table document is invalid: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no record with id {0}")]
    UnknownRecord(String),
}
