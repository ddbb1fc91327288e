//! Legacy code tables for the letter export.
//!
//! The export carries the two-letter codes of the old case system. Each table
//! maps a legacy code to the canonical name used by the decision table. Codes
//! that no table knows are passed through unchanged by the ingester; the export
//! regularly contains retired and not-yet-mapped codes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

// ── Canonical names referenced by the engine ──

pub const APPEAL: &str = "APPEAL";
pub const CORRECTION: &str = "CORRECTION";
pub const OWN_INITIATIVE: &str = "OWN_INITIATIVE";
pub const ESTABLISHMENT: &str = "ESTABLISHMENT";
pub const REVISION: &str = "REVISION";
pub const WITHDRAWAL: &str = "WITHDRAWAL";

/// Verdict types that only disambiguate during merging and are never offered
/// as a selectable verdict.
pub const MERGE_ONLY_VERDICTS: &[&str] = &[CORRECTION, OWN_INITIATIVE];

// ── Fixed tables ──

/// Case category (soknadsgruppe) → canonical category.
pub const CASE_CATEGORIES: &[(&str, &str)] = &[
    ("BI", "BIDRAG"),
    ("FO", "FORSKUDD"),
    ("18", "BIDRAG18AAR"),
    ("EB", "EKTEFELLEBIDRAG"),
    ("OB", "OPPFOSTRINGSBIDRAG"),
    ("MR", "MOTREGNING"),
    ("SB", "SAERBIDRAG"),
    ("GB", "GEBYR"),
    ("EG", "ETTERGIVELSE"),
    ("TK", "TILBAKEKREVING"),
    ("DO", "DIREKTE_OPPGJOR"),
    ("FA", "FARSKAP"),
    ("ES", "ERSTATNING"),
];

/// Case subtype (undergruppe) → canonical subtype.
pub const CASE_SUBTYPES: &[(&str, &str)] = &[
    ("01", "ORDINAER"),
    ("02", "UTLAND"),
    ("03", "PRIVAT_AVTALE"),
    ("04", "INNKREVING"),
];

/// Application type (soknadstype) → (canonical application type, implied verdict type).
pub const APPLICATION_TYPES: &[(&str, &str, &str)] = &[
    ("FA", ESTABLISHMENT, ESTABLISHMENT),
    ("EN", "CHANGE", "CHANGE"),
    ("KL", APPEAL, APPEAL),
    ("OM", "REVERSAL", APPEAL),
    ("EG", OWN_INITIATIVE, OWN_INITIATIVE),
    ("KR", CORRECTION, CORRECTION),
    ("OH", "DISCONTINUATION", "DISCONTINUATION"),
    ("RV", REVISION, REVISION),
    ("IR", "INDEX_ADJUSTMENT", "INDEX_ADJUSTMENT"),
    ("AJ", "AGE_ADJUSTMENT", "AGE_ADJUSTMENT"),
    ("IK", "COLLECTION", "COLLECTION"),
    ("TT", WITHDRAWAL, WITHDRAWAL),
    ("PA", "PRIVATE_AGREEMENT", ESTABLISHMENT),
];

/// Application origin (sokt av) → canonical origin.
pub const APPLICATION_ORIGINS: &[(&str, &str)] = &[
    ("BM", "RECIPIENT"),
    ("BP", "PAYER"),
    ("BB", "CHILD"),
    ("NA", "NAV"),
    ("KO", "MUNICIPALITY"),
    ("FN", "COUNTY_BOARD"),
    ("UT", "FOREIGN_AUTHORITY"),
    ("VE", "GUARDIAN"),
    ("TR", "COURT"),
];

/// Canonical categories that are periodic benefits.
pub const STONAD_TYPES: &[&str] = &[
    "BIDRAG",
    "FORSKUDD",
    "BIDRAG18AAR",
    "EKTEFELLEBIDRAG",
    "OPPFOSTRINGSBIDRAG",
    "MOTREGNING",
];

/// Canonical categories that are one-off amounts.
pub const ENGANGSBELOP_TYPES: &[&str] = &[
    "SAERBIDRAG",
    "GEBYR",
    "ETTERGIVELSE",
    "TILBAKEKREVING",
    "DIREKTE_OPPGJOR",
];

/// Retired or superseded letter codes. Rows carrying one are dropped.
pub const IGNORED_LETTER_CODES: &[&str] = &[
    "BI01A50", "BI01B01", "BI01S01", "BI01X01", "BI01X02", "BI01P17",
];

/// Enheter belonging to the appeals unit.
pub const APPEALS_UNIT_ENHETER: &[&str] = &["4291", "4292", "4293", "4294", "4295", "2103"];

pub fn is_appeals_unit_enhet(enhet: &str) -> bool {
    APPEALS_UNIT_ENHETER.contains(&enhet.trim())
}

/// Stonad/engangsbelop classification of a canonical case category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub stonad_type: Option<String>,
    pub engangsbelop_type: Option<String>,
}

impl Classification {
    /// Both kinds set. The fixed tables never produce this, an overlay can.
    pub fn is_ambiguous(&self) -> bool {
        self.stonad_type.is_some() && self.engangsbelop_type.is_some()
    }

    pub fn is_unclassified(&self) -> bool {
        self.stonad_type.is_none() && self.engangsbelop_type.is_none()
    }
}

/// Lookup tables used by the ingester.
///
/// [`Vocabulary::default`] holds the fixed tables above. An overlay loaded from
/// JSON can add codes or override existing mappings without a rebuild.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    case_categories: BTreeMap<String, String>,
    case_subtypes: BTreeMap<String, String>,
    application_types: BTreeMap<String, (String, String)>,
    application_origins: BTreeMap<String, String>,
    stonad_types: BTreeSet<String>,
    engangsbelop_types: BTreeSet<String>,
    ignored_letter_codes: BTreeSet<String>,
}

/// An application type entry in a [`VocabularyOverlay`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationTypeEntry {
    pub application_type: String,
    pub verdict_type: String,
}

/// Additions and overrides for the fixed tables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VocabularyOverlay {
    pub case_categories: BTreeMap<String, String>,
    pub case_subtypes: BTreeMap<String, String>,
    pub application_types: BTreeMap<String, ApplicationTypeEntry>,
    pub application_origins: BTreeMap<String, String>,
    pub stonad_types: Vec<String>,
    pub engangsbelop_types: Vec<String>,
    pub ignored_letter_codes: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

impl Vocabulary {
    /// The fixed tables.
    pub fn standard() -> Self {
        Self {
            case_categories: pairs(CASE_CATEGORIES),
            case_subtypes: pairs(CASE_SUBTYPES),
            application_types: APPLICATION_TYPES
                .iter()
                .map(|(code, kind, verdict)| {
                    (code.to_string(), (kind.to_string(), verdict.to_string()))
                })
                .collect(),
            application_origins: pairs(APPLICATION_ORIGINS),
            stonad_types: names(STONAD_TYPES),
            engangsbelop_types: names(ENGANGSBELOP_TYPES),
            ignored_letter_codes: names(IGNORED_LETTER_CODES),
        }
    }

    /// Apply an overlay on top of the current tables. Overlay entries win.
    pub fn with_overlay(mut self, overlay: VocabularyOverlay) -> Self {
        self.case_categories.extend(overlay.case_categories);
        self.case_subtypes.extend(overlay.case_subtypes);
        self.application_types.extend(
            overlay
                .application_types
                .into_iter()
                .map(|(code, e)| (code, (e.application_type, e.verdict_type))),
        );
        self.application_origins.extend(overlay.application_origins);
        self.stonad_types.extend(overlay.stonad_types);
        self.engangsbelop_types.extend(overlay.engangsbelop_types);
        self.ignored_letter_codes.extend(overlay.ignored_letter_codes);
        self
    }

    pub fn case_category(&self, code: &str) -> Option<&str> {
        self.case_categories.get(code).map(String::as_str)
    }

    pub fn case_subtype(&self, code: &str) -> Option<&str> {
        self.case_subtypes.get(code).map(String::as_str)
    }

    /// Canonical application type and the verdict type it implies.
    pub fn application_type(&self, code: &str) -> Option<(&str, &str)> {
        self.application_types
            .get(code)
            .map(|(kind, verdict)| (kind.as_str(), verdict.as_str()))
    }

    pub fn application_origin(&self, code: &str) -> Option<&str> {
        self.application_origins.get(code).map(String::as_str)
    }

    pub fn is_ignored(&self, letter_code: &str) -> bool {
        self.ignored_letter_codes.contains(letter_code)
    }

    /// Classify a canonical case category as stonad or engangsbelop.
    pub fn classify(&self, category: &str) -> Classification {
        Classification {
            stonad_type: self
                .stonad_types
                .contains(category)
                .then(|| category.to_string()),
            engangsbelop_type: self
                .engangsbelop_types
                .contains(category)
                .then(|| category.to_string()),
        }
    }
}

fn pairs(table: &[(&str, &str)]) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn names(table: &[&str]) -> BTreeSet<String> {
    table.iter().map(|s| s.to_string()).collect()
}
