//! Compacted table persistence.

use std::io::Write;
use std::path::Path;

use brevvalg_core::CompactedTable;
use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

/// Write `table` as pretty JSON. The file is written to a temporary file in
/// the target directory and renamed into place, so readers never see a
/// partial table.
pub fn write_table(path: &Path, table: &CompactedTable) -> Result<(), StoreError> {
    let json = table.to_json_pretty()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    info!(
        buckets = table.len(),
        rules = table.rule_count(),
        path = %path.display(),
        "wrote compacted table"
    );
    Ok(())
}

pub fn read_table(path: &Path) -> Result<CompactedTable, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    let table = CompactedTable::from_json_str(&json)?;
    info!(
        buckets = table.len(),
        rules = table.rule_count(),
        "loaded compacted table"
    );
    Ok(table)
}
