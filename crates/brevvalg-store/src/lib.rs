//! Storage layer: legacy exports in, compacted tables and catalogs in and out.

mod catalog;
mod error;
mod export;
mod table;

pub use catalog::{load_catalog, load_vocabulary_overlay};
pub use error::StoreError;
pub use export::{ExportFormat, read_csv_batches, read_export};
pub use table::{read_table, write_table};
