//! Ingestion of the flat letter export.
//!
//! Rows arrive either as JSON objects or as Arrow `RecordBatch`es (the CSV
//! path). Column names are legacy identifiers and are trimmed before lookup.
//! Each surviving row becomes one [`RawLetterRecord`], grouped by canonical
//! case category.

use std::collections::{BTreeMap, BTreeSet};

use arrow::array::{Array, ArrayRef, BooleanArray, LargeStringArray, StringArray};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::vocabulary::Vocabulary;

/// Legacy column identifiers.
pub mod columns {
    pub const CASE_CATEGORY: &str = "SOKNADSGRUPPE";
    pub const CASE_SUBTYPE: &str = "UNDERGRUPPE";
    pub const APPLICATION_TYPE: &str = "SOKNADSTYPE";
    pub const APPLICATION_ORIGIN: &str = "SOKT_AV";
    pub const LETTER_CODE: &str = "BREVKODE";
    pub const APPEALS_UNIT: &str = "KLAGEENHET";
    pub const NON_RECOVERY_DECISION: &str = "VEDTAK_IKKE_TILBAKEKREVING";
    pub const DECISION_ISSUED: &str = "VEDTAK_FATTET";
    pub const MANUALLY_CALCULATED: &str = "MANUELL_BEREGNING";
    pub const TITLE: &str = "BESKRIVELSE";

    pub const REQUIRED: &[&str] = &[
        CASE_CATEGORY,
        APPLICATION_TYPE,
        APPLICATION_ORIGIN,
        LETTER_CODE,
    ];
}

/// One export row with trimmed values and parsed flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyRow {
    pub case_category: String,
    pub case_subtype: Option<String>,
    pub application_type: String,
    pub application_origin: String,
    pub letter_code: String,
    pub is_appeals_unit: bool,
    pub is_non_recovery_decision: bool,
    pub is_decision_issued: bool,
    pub is_manually_calculated: bool,
    pub title: Option<String>,
}

/// A single cell value, independent of the row source.
enum Cell {
    Missing,
    Text(String),
    Bool(bool),
}

impl LegacyRow {
    fn from_cells(
        row: usize,
        mut cell: impl FnMut(&'static str) -> Result<Cell, IngestError>,
    ) -> Result<Self, IngestError> {
        let mut required = |column: &'static str| -> Result<String, IngestError> {
            match cell(column)? {
                Cell::Text(s) if !s.is_empty() => Ok(s),
                Cell::Bool(_) => Err(IngestError::UnsupportedValue {
                    row,
                    column,
                    kind: "boolean".into(),
                }),
                _ => Err(IngestError::MissingValue { row, column }),
            }
        };
        let case_category = required(columns::CASE_CATEGORY)?;
        let application_type = required(columns::APPLICATION_TYPE)?;
        let application_origin = required(columns::APPLICATION_ORIGIN)?;
        let letter_code = required(columns::LETTER_CODE)?;

        let mut optional = |column: &'static str| -> Result<Option<String>, IngestError> {
            Ok(match cell(column)? {
                Cell::Text(s) if !s.is_empty() => Some(s),
                _ => None,
            })
        };
        let case_subtype = optional(columns::CASE_SUBTYPE)?;
        let title = optional(columns::TITLE)?;

        let mut flag = |column: &'static str| -> Result<bool, IngestError> {
            match cell(column)? {
                Cell::Missing => Ok(false),
                Cell::Bool(b) => Ok(b),
                Cell::Text(s) => parse_flag(row, column, &s),
            }
        };

        Ok(Self {
            case_category,
            case_subtype,
            application_type,
            application_origin,
            letter_code,
            is_appeals_unit: flag(columns::APPEALS_UNIT)?,
            is_non_recovery_decision: flag(columns::NON_RECOVERY_DECISION)?,
            is_decision_issued: flag(columns::DECISION_ISSUED)?,
            is_manually_calculated: flag(columns::MANUALLY_CALCULATED)?,
            title,
        })
    }

    /// Build a row from one JSON object of the export.
    pub fn from_json_object(
        row: usize,
        object: &serde_json::Map<String, Value>,
    ) -> Result<Self, IngestError> {
        let trimmed: BTreeMap<&str, &Value> =
            object.iter().map(|(k, v)| (k.trim(), v)).collect();

        Self::from_cells(row, |column| match trimmed.get(column) {
            None | Some(Value::Null) => Ok(Cell::Missing),
            Some(Value::String(s)) => Ok(Cell::Text(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Cell::Text(n.to_string())),
            Some(Value::Bool(b)) => Ok(Cell::Bool(*b)),
            Some(other) => Err(IngestError::UnsupportedValue {
                row,
                column,
                kind: json_kind(other).into(),
            }),
        })
    }
}

/// Parse a legacy flag value.
///
/// Accepts `J`/`N`, `Y`/`N`, `true`/`false` and `1`/`0`, case-insensitive.
/// An empty value is `false`.
pub fn parse_flag(row: usize, column: &'static str, raw: &str) -> Result<bool, IngestError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "" | "N" | "NEI" | "FALSE" | "0" => Ok(false),
        "J" | "JA" | "Y" | "TRUE" | "1" => Ok(true),
        _ => Err(IngestError::InvalidFlag {
            row,
            column,
            value: raw.to_string(),
        }),
    }
}

/// Parse a JSON export: an array of row objects.
pub fn rows_from_json(value: &Value) -> Result<Vec<LegacyRow>, IngestError> {
    let items = value.as_array().ok_or(IngestError::NotAnArray)?;
    items
        .iter()
        .enumerate()
        .map(|(row, item)| {
            let object = item.as_object().ok_or(IngestError::NotAnArray)?;
            LegacyRow::from_json_object(row, object)
        })
        .collect()
}

pub fn rows_from_json_str(json: &str) -> Result<Vec<LegacyRow>, IngestError> {
    let value: Value = serde_json::from_str(json)?;
    rows_from_json(&value)
}

/// Fail on the first required column missing from `schema`.
///
/// Call this on the reader's schema as well, since an export with a header
/// and no data rows yields no batches to check.
pub fn check_schema(schema: &Schema) -> Result<(), IngestError> {
    for column in columns::REQUIRED {
        if !schema.fields().iter().any(|f| f.name().trim() == *column) {
            return Err(IngestError::MissingColumn(column));
        }
    }
    Ok(())
}

/// Parse rows from Arrow batches (Utf8, LargeUtf8 or Boolean columns).
///
/// Row numbers in errors count across all batches.
pub fn rows_from_batches(batches: &[RecordBatch]) -> Result<Vec<LegacyRow>, IngestError> {
    let mut rows = Vec::new();
    let mut offset = 0;

    for batch in batches {
        check_schema(&batch.schema())?;

        for i in 0..batch.num_rows() {
            let row = offset + i;
            rows.push(LegacyRow::from_cells(row, |column| {
                match column_by_trimmed_name(batch, column) {
                    Some(col) => cell_at(col.as_ref(), i, row, column),
                    None => Ok(Cell::Missing),
                }
            })?);
        }
        offset += batch.num_rows();
    }

    Ok(rows)
}

// ── Records ──

/// One export row translated to canonical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLetterRecord {
    pub case_category: String,
    pub case_subtype: Option<String>,
    pub stonad_type: Option<String>,
    pub engangsbelop_type: Option<String>,
    pub application_type: Vec<String>,
    pub verdict_type: Vec<String>,
    pub application_origin: Vec<String>,
    pub letter_codes: Vec<String>,
    pub is_appeals_unit: bool,
    pub is_non_recovery_decision: bool,
    pub is_decision_issued: bool,
    pub is_manually_calculated: bool,
    pub title: String,
}

/// Diagnostics collected while ingesting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_ignored: usize,
    pub records: usize,
    /// Codes passed through unmapped, keyed by dimension.
    pub passthrough: BTreeMap<&'static str, BTreeSet<String>>,
    /// Canonical categories that are neither stonad nor engangsbelop.
    pub unclassified_categories: BTreeSet<String>,
    /// Canonical categories classified as both. Stonad takes precedence.
    pub ambiguous_categories: BTreeSet<String>,
}

impl IngestReport {
    fn translate(&mut self, dimension: &'static str, code: &str, mapped: Option<&str>) -> String {
        match mapped {
            Some(name) => name.to_string(),
            None => {
                if self
                    .passthrough
                    .entry(dimension)
                    .or_default()
                    .insert(code.to_string())
                {
                    debug!(dimension, code, "unmapped code passed through");
                }
                code.to_string()
            }
        }
    }
}

/// Ingested records grouped by canonical case category.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    pub groups: BTreeMap<String, Vec<RawLetterRecord>>,
    pub report: IngestReport,
}

/// Translate rows into records, dropping ignore-listed letter codes.
pub fn ingest(rows: &[LegacyRow], vocabulary: &Vocabulary) -> Ingested {
    let mut report = IngestReport {
        rows_read: rows.len(),
        ..Default::default()
    };
    let mut groups: BTreeMap<String, Vec<RawLetterRecord>> = BTreeMap::new();

    for row in rows {
        if vocabulary.is_ignored(&row.letter_code) {
            report.rows_ignored += 1;
            continue;
        }

        let case_category = report.translate(
            "caseCategory",
            &row.case_category,
            vocabulary.case_category(&row.case_category),
        );
        let case_subtype = row.case_subtype.as_deref().map(|code| {
            report.translate("caseSubtype", code, vocabulary.case_subtype(code))
        });
        let (application_type, verdict_type) =
            match vocabulary.application_type(&row.application_type) {
                Some((kind, verdict)) => (kind.to_string(), verdict.to_string()),
                None => {
                    let raw = report.translate("applicationType", &row.application_type, None);
                    (raw.clone(), raw)
                }
            };
        let application_origin = report.translate(
            "applicationOrigin",
            &row.application_origin,
            vocabulary.application_origin(&row.application_origin),
        );

        let mut classification = vocabulary.classify(&case_category);
        if classification.is_ambiguous() {
            if report.ambiguous_categories.insert(case_category.clone()) {
                warn!(
                    category = %case_category,
                    "category classified as both stonad and engangsbelop"
                );
            }
            classification.engangsbelop_type = None;
        } else if classification.is_unclassified() {
            report.unclassified_categories.insert(case_category.clone());
        }

        let record = RawLetterRecord {
            case_category: case_category.clone(),
            case_subtype,
            stonad_type: classification.stonad_type,
            engangsbelop_type: classification.engangsbelop_type,
            application_type: vec![application_type],
            verdict_type: vec![verdict_type],
            application_origin: vec![application_origin],
            letter_codes: vec![row.letter_code.clone()],
            is_appeals_unit: row.is_appeals_unit,
            is_non_recovery_decision: row.is_non_recovery_decision,
            is_decision_issued: row.is_decision_issued,
            is_manually_calculated: row.is_manually_calculated,
            title: row.title.clone().unwrap_or_default(),
        };
        groups.entry(case_category).or_default().push(record);
        report.records += 1;
    }

    info!(
        rows = report.rows_read,
        ignored = report.rows_ignored,
        categories = groups.len(),
        "ingested letter export"
    );

    Ingested { groups, report }
}

// ── Arrow extraction helpers ──

fn column_by_trimmed_name<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a ArrayRef> {
    let idx = batch
        .schema()
        .fields()
        .iter()
        .position(|f| f.name().trim() == name)?;
    Some(batch.column(idx))
}

fn cell_at(
    col: &dyn Array,
    i: usize,
    row: usize,
    column: &'static str,
) -> Result<Cell, IngestError> {
    if col.is_null(i) {
        return Ok(Cell::Missing);
    }
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return Ok(Cell::Text(arr.value(i).trim().to_string()));
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Ok(Cell::Text(arr.value(i).trim().to_string()));
    }
    if let Some(arr) = col.as_any().downcast_ref::<BooleanArray>() {
        return Ok(Cell::Bool(arr.value(i)));
    }
    Err(IngestError::UnsupportedValue {
        row,
        column,
        kind: format!("{:?}", col.data_type()),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::BooleanBuilder;
    use arrow::datatypes::{DataType, Field, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn row(category: &str, kind: &str, origin: &str, code: &str) -> LegacyRow {
        LegacyRow {
            case_category: category.into(),
            application_type: kind.into(),
            application_origin: origin.into(),
            letter_code: code.into(),
            ..Default::default()
        }
    }

    #[test]
    fn json_keys_and_values_are_trimmed() {
        let rows = rows_from_json(&json!([{
            " SOKNADSGRUPPE ": "BI ",
            "SOKNADSTYPE": " EN",
            "SOKT_AV": "BP",
            "BREVKODE ": " BI01S02 ",
            "KLAGEENHET": "J",
            "VEDTAK_FATTET": true,
            "MANUELL_BEREGNING": "n",
            "BESKRIVELSE": "Varsel"
        }]))
        .unwrap();

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.case_category, "BI");
        assert_eq!(r.application_type, "EN");
        assert_eq!(r.letter_code, "BI01S02");
        assert!(r.is_appeals_unit);
        assert!(r.is_decision_issued);
        assert!(!r.is_manually_calculated);
        assert!(!r.is_non_recovery_decision);
        assert_eq!(r.title.as_deref(), Some("Varsel"));
        assert_eq!(r.case_subtype, None);
    }

    #[test]
    fn numeric_codes_are_accepted() {
        let rows = rows_from_json(&json!([{
            "SOKNADSGRUPPE": 18, "SOKNADSTYPE": "FA", "SOKT_AV": "BB", "BREVKODE": "BI01A01"
        }]))
        .unwrap();
        assert_eq!(rows[0].case_category, "18");
    }

    #[test]
    fn missing_letter_code_is_an_error() {
        let err = rows_from_json(&json!([{
            "SOKNADSGRUPPE": "BI", "SOKNADSTYPE": "FA", "SOKT_AV": "BM", "BREVKODE": " "
        }]))
        .unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingValue { row: 0, column: columns::LETTER_CODE }
        ));
    }

    #[test]
    fn invalid_flag_is_an_error() {
        let err = rows_from_json(&json!([{
            "SOKNADSGRUPPE": "BI", "SOKNADSTYPE": "FA", "SOKT_AV": "BM",
            "BREVKODE": "BI01B01", "VEDTAK_FATTET": "kanskje"
        }]))
        .unwrap_err();
        assert!(matches!(err, IngestError::InvalidFlag { .. }));
    }

    #[test]
    fn non_array_is_rejected() {
        assert!(matches!(
            rows_from_json_str(r#"{"BREVKODE": "x"}"#),
            Err(IngestError::NotAnArray)
        ));
    }

    #[test]
    fn parse_flag_variants() {
        for raw in ["J", "j", "Y", "true", "1", " JA "] {
            assert!(parse_flag(0, "X", raw).unwrap(), "{raw}");
        }
        for raw in ["N", "false", "0", "", "nei"] {
            assert!(!parse_flag(0, "X", raw).unwrap(), "{raw}");
        }
    }

    fn export_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new(" SOKNADSGRUPPE", DataType::Utf8, false),
            Field::new("SOKNADSTYPE", DataType::Utf8, false),
            Field::new("SOKT_AV", DataType::Utf8, false),
            Field::new("BREVKODE", DataType::Utf8, false),
            Field::new("VEDTAK_FATTET", DataType::Boolean, true),
            Field::new("KLAGEENHET", DataType::Utf8, true),
        ]);

        let mut issued = BooleanBuilder::new();
        issued.append_value(true);
        issued.append_null();

        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["BI", "FO"])),
                Arc::new(StringArray::from(vec!["EN", "KL"])),
                Arc::new(StringArray::from(vec!["BP", "BM"])),
                Arc::new(StringArray::from(vec!["BI01G50", "BI01G02"])),
                Arc::new(issued.finish()),
                Arc::new(StringArray::from(vec![Some("N"), Some("J")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_from_arrow_batches() {
        let rows = rows_from_batches(&[export_batch()]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].case_category, "BI");
        assert!(rows[0].is_decision_issued);
        assert!(!rows[0].is_appeals_unit);
        assert_eq!(rows[1].letter_code, "BI01G02");
        assert!(!rows[1].is_decision_issued);
        assert!(rows[1].is_appeals_unit);
    }

    #[test]
    fn arrow_batch_without_letter_code_column_fails() {
        let schema = Schema::new(vec![
            Field::new("SOKNADSGRUPPE", DataType::Utf8, false),
            Field::new("SOKNADSTYPE", DataType::Utf8, false),
            Field::new("SOKT_AV", DataType::Utf8, false),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["BI"])),
                Arc::new(StringArray::from(vec!["EN"])),
                Arc::new(StringArray::from(vec!["BP"])),
            ],
        )
        .unwrap();
        assert!(matches!(
            rows_from_batches(&[batch]),
            Err(IngestError::MissingColumn(columns::LETTER_CODE))
        ));
    }

    #[test]
    fn schema_check_names_missing_column() {
        let header_only = Schema::new(vec![
            Field::new(" SOKNADSGRUPPE ", DataType::Utf8, true),
            Field::new("SOKNADSTYPE", DataType::Utf8, true),
            Field::new("SOKT_AV", DataType::Utf8, true),
        ]);
        assert!(matches!(
            check_schema(&header_only),
            Err(IngestError::MissingColumn(columns::LETTER_CODE))
        ));
        assert!(check_schema(&export_batch().schema()).is_ok());
    }

    #[test]
    fn ingest_translates_and_groups() {
        let rows = vec![
            row("BI", "KL", "BM", "BI01K50"),
            row("FO", "EN", "BP", "BI01A04"),
            row("BI", "OM", "BP", "BI01K50"),
        ];
        let ingested = ingest(&rows, &Vocabulary::standard());

        assert_eq!(ingested.groups.len(), 2);
        let bidrag = &ingested.groups["BIDRAG"];
        assert_eq!(bidrag.len(), 2);
        assert_eq!(bidrag[0].application_type, vec!["APPEAL"]);
        assert_eq!(bidrag[0].verdict_type, vec!["APPEAL"]);
        assert_eq!(bidrag[0].application_origin, vec!["RECIPIENT"]);
        assert_eq!(bidrag[1].application_type, vec!["REVERSAL"]);
        assert_eq!(bidrag[1].verdict_type, vec!["APPEAL"]);
        assert_eq!(bidrag[0].stonad_type.as_deref(), Some("BIDRAG"));
        assert_eq!(bidrag[0].engangsbelop_type, None);
        assert_eq!(ingested.report.records, 3);
    }

    #[test]
    fn ignored_letter_codes_are_dropped() {
        let rows = vec![
            row("BI", "EN", "BP", "BI01X01"),
            row("BI", "EN", "BP", "BI01S02"),
        ];
        let ingested = ingest(&rows, &Vocabulary::standard());
        assert_eq!(ingested.report.rows_read, 2);
        assert_eq!(ingested.report.rows_ignored, 1);
        assert_eq!(ingested.groups["BIDRAG"].len(), 1);
    }

    #[test]
    fn unknown_codes_pass_through() {
        let rows = vec![row("QQ", "ZZ", "YY", "BI01Q01")];
        let ingested = ingest(&rows, &Vocabulary::standard());

        let record = &ingested.groups["QQ"][0];
        assert_eq!(record.application_type, vec!["ZZ"]);
        assert_eq!(record.verdict_type, vec!["ZZ"]);
        assert_eq!(record.application_origin, vec!["YY"]);
        assert!(ingested.report.unclassified_categories.contains("QQ"));
        assert!(ingested.report.passthrough["caseCategory"].contains("QQ"));
        assert!(ingested.report.passthrough["applicationType"].contains("ZZ"));
    }

    #[test]
    fn ambiguous_category_keeps_stonad_and_continues() {
        let vocabulary = Vocabulary::standard().with_overlay(crate::vocabulary::VocabularyOverlay {
            engangsbelop_types: vec!["FORSKUDD".into()],
            ..Default::default()
        });
        let rows = vec![
            row("FO", "EN", "BP", "BI01A04"),
            row("GB", "FA", "BP", "BI01G10"),
        ];
        let ingested = ingest(&rows, &vocabulary);

        assert!(ingested.report.ambiguous_categories.contains("FORSKUDD"));
        let forskudd = &ingested.groups["FORSKUDD"][0];
        assert_eq!(forskudd.stonad_type.as_deref(), Some("FORSKUDD"));
        assert_eq!(forskudd.engangsbelop_type, None);
        assert_eq!(
            ingested.groups["GEBYR"][0].engangsbelop_type.as_deref(),
            Some("GEBYR")
        );
    }
}
