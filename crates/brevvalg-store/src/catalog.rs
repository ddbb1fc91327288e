//! Template catalog and vocabulary overlay files.

use std::path::Path;

use brevvalg_core::StaticCatalog;
use brevvalg_core::vocabulary::VocabularyOverlay;
use tracing::info;

use crate::StoreError;

/// Load a JSON array of template metadata.
pub fn load_catalog(path: &Path) -> Result<StaticCatalog, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    let catalog: StaticCatalog = serde_json::from_str(&json)?;
    info!(templates = catalog.len(), "loaded template catalog");
    Ok(catalog)
}

pub fn load_vocabulary_overlay(path: &Path) -> Result<VocabularyOverlay, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
