//! Readers for the legacy letter export.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use brevvalg_core::LegacyRow;
use brevvalg_core::ingest::{check_schema, rows_from_batches, rows_from_json_str};
use tracing::info;

use crate::StoreError;

const CSV_BATCH_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    /// Format from the file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Read an export file into rows, choosing the reader by extension.
pub fn read_export(path: &Path) -> Result<Vec<LegacyRow>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let rows = match ExportFormat::from_path(path)? {
        ExportFormat::Json => {
            let json = std::fs::read_to_string(path)?;
            rows_from_json_str(&json)?
        }
        ExportFormat::Csv => {
            let (schema, batches) = read_csv_batches(path)?;
            check_schema(&schema)?;
            rows_from_batches(&batches)?
        }
    };
    info!(rows = rows.len(), path = %path.display(), "read letter export");
    Ok(rows)
}

/// Read a CSV export with a header row. Every column is read as Utf8 under its
/// trimmed header name; flag parsing happens at ingest. The schema is returned
/// alongside the batches, which are empty for a header-only file.
pub fn read_csv_batches(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>), StoreError> {
    let mut file = File::open(path)?;
    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(0))?;
    file.seek(SeekFrom::Start(0))?;

    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name().trim(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok((schema, batches))
}
