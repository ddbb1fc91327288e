//! Letter-code decision table.
//!
//! A legacy export of letter codes is ingested ([`ingest`]), compacted into
//! bucketed rules by a fixed sequence of merge passes ([`compact`]), amended
//! by manual patches ([`patch`]), and queried at runtime ([`matcher`]).

pub mod alias;
pub mod compact;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod patch;
pub mod rule;
pub mod table;
pub mod vocabulary;

pub use compact::Compactor;
pub use error::IngestError;
pub use ingest::{IngestReport, LegacyRow, RawLetterRecord};
pub use matcher::{
    DocumentSelector, LetterOption, Query, StaticCatalog, TemplateCatalog, TemplateMeta,
};
pub use rule::{BehandlingStatus, CompactedRule, Flag, Forvaltning, IssuedDecision};
pub use table::CompactedTable;
pub use vocabulary::Vocabulary;

/// Ingest `rows` and compact them with the standard passes and patches.
pub fn compile(rows: &[LegacyRow], vocabulary: &Vocabulary) -> (CompactedTable, IngestReport) {
    let ingested = ingest::ingest(rows, vocabulary);
    let table = Compactor::standard().compact(ingested.groups);
    (table, ingested.report)
}
