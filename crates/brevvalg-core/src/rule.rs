//! Rule shapes shared by the compactor, the patch layer and the matcher.

use serde::{Deserialize, Serialize};

use crate::ingest::RawLetterRecord;
use crate::vocabulary::{APPEAL, MERGE_ONLY_VERDICTS, is_appeals_unit_enhet};

/// A boolean dimension that a merge pass may widen to a wildcard.
///
/// Serialised as an optional boolean: `Any` is written as an absent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Flag {
    Yes,
    No,
    #[default]
    Any,
}

impl Flag {
    pub fn is_any(&self) -> bool {
        matches!(self, Flag::Any)
    }

    /// Whether a concrete value is admitted by this flag.
    pub fn admits(self, value: bool) -> bool {
        match self {
            Flag::Any => true,
            Flag::Yes => value,
            Flag::No => !value,
        }
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        if value { Flag::Yes } else { Flag::No }
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        value.map(Flag::from).unwrap_or(Flag::Any)
    }
}

impl From<Flag> for Option<bool> {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Yes => Some(true),
            Flag::No => Some(false),
            Flag::Any => None,
        }
    }
}

/// How a decision was issued, as supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuedDecision {
    Manual,
    Calculated,
}

/// Decision status a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehandlingStatus {
    NotApplicable,
    NotIssued,
    /// Issued, regardless of how it was calculated.
    Issued,
    IssuedManual,
    IssuedCalculated,
}

impl BehandlingStatus {
    pub fn from_flags(issued: Flag, manual: Flag) -> Self {
        match (issued, manual) {
            (Flag::Any, _) => Self::NotApplicable,
            (Flag::No, _) => Self::NotIssued,
            (Flag::Yes, Flag::Yes) => Self::IssuedManual,
            (Flag::Yes, Flag::No) => Self::IssuedCalculated,
            (Flag::Yes, Flag::Any) => Self::Issued,
        }
    }

    /// Whether a caller's decision state is admitted. `None` means no
    /// decision has been issued yet.
    pub fn admits(self, decision: Option<IssuedDecision>) -> bool {
        match self {
            Self::NotApplicable | Self::NotIssued => decision.is_none(),
            Self::IssuedManual => decision == Some(IssuedDecision::Manual),
            Self::IssuedCalculated => decision == Some(IssuedDecision::Calculated),
            Self::Issued => decision.is_some(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::NotIssued => "NOT_ISSUED",
            Self::Issued => "ISSUED",
            Self::IssuedManual => "ISSUED_MANUAL",
            Self::IssuedCalculated => "ISSUED_CALCULATED",
        }
    }
}

/// Which organisational unit may use a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Forvaltning {
    Standard,
    Appeals,
    Either,
}

impl Forvaltning {
    pub fn from_flag(is_appeals_unit: Flag) -> Self {
        match is_appeals_unit {
            Flag::Yes => Self::Appeals,
            Flag::No => Self::Standard,
            Flag::Any => Self::Either,
        }
    }

    /// Whether the caller's enhet may use the rule.
    pub fn admits(self, enhet: Option<&str>) -> bool {
        match self {
            Self::Either | Self::Standard => true,
            Self::Appeals => enhet.is_some_and(is_appeals_unit_enhet),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Appeals => "APPEALS",
            Self::Either => "EITHER",
        }
    }
}

/// The unit the merge passes operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRule {
    /// Input position of the record that founded this rule.
    pub lineage: usize,
    pub case_category: String,
    pub case_subtype: Option<String>,
    pub stonad_type: Option<String>,
    pub engangsbelop_type: Option<String>,
    pub application_type: Vec<String>,
    pub verdict_type: Vec<String>,
    pub application_origin: Vec<String>,
    pub letter_codes: Vec<String>,
    pub is_appeals_unit: Flag,
    pub is_non_recovery_decision: Flag,
    pub is_decision_issued: Flag,
    pub is_manually_calculated: Flag,
    pub title: String,
}

impl MergedRule {
    pub fn from_record(lineage: usize, record: RawLetterRecord) -> Self {
        Self {
            lineage,
            case_category: record.case_category,
            case_subtype: record.case_subtype,
            stonad_type: record.stonad_type,
            engangsbelop_type: record.engangsbelop_type,
            application_type: record.application_type,
            verdict_type: record.verdict_type,
            application_origin: record.application_origin,
            letter_codes: record.letter_codes,
            is_appeals_unit: record.is_appeals_unit.into(),
            is_non_recovery_decision: record.is_non_recovery_decision.into(),
            is_decision_issued: record.is_decision_issued.into(),
            is_manually_calculated: record.is_manually_calculated.into(),
            title: record.title,
        }
    }

    /// Non-recovery decision on an appeal. Passes that honour the exception
    /// never merge such a rule, in either direction.
    pub fn is_standalone_appeal(&self) -> bool {
        self.is_non_recovery_decision == Flag::Yes && self.verdict_type.iter().any(|v| v == APPEAL)
    }

    /// Bucket key: stonad type, else engangsbelop type, else the category itself.
    pub fn behavior_type(&self) -> &str {
        self.stonad_type
            .as_deref()
            .or(self.engangsbelop_type.as_deref())
            .unwrap_or(&self.case_category)
    }

    /// Strip bookkeeping and derive status and authority. Letter codes are
    /// returned as-is; alias collapse is applied by the caller.
    pub fn into_compacted(self) -> CompactedRule {
        let behandling_status =
            BehandlingStatus::from_flags(self.is_decision_issued, self.is_manually_calculated);
        let forvaltning = Forvaltning::from_flag(self.is_appeals_unit);
        let verdict_type = self
            .verdict_type
            .into_iter()
            .filter(|v| !MERGE_ONLY_VERDICTS.contains(&v.as_str()))
            .collect();
        CompactedRule {
            stonad_type: self.stonad_type,
            engangsbelop_type: self.engangsbelop_type,
            application_type: self.application_type,
            verdict_type,
            application_origin: self.application_origin,
            is_non_recovery_decision: self.is_non_recovery_decision,
            behandling_status,
            forvaltning,
            letter_codes: self.letter_codes,
        }
    }
}

/// A decision-table rule as persisted and matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactedRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stonad_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engangsbelop_type: Option<String>,
    pub application_type: Vec<String>,
    pub verdict_type: Vec<String>,
    pub application_origin: Vec<String>,
    #[serde(default, skip_serializing_if = "Flag::is_any")]
    pub is_non_recovery_decision: Flag,
    pub behandling_status: BehandlingStatus,
    pub forvaltning: Forvaltning,
    pub letter_codes: Vec<String>,
}

// ── List helpers ──

/// Equal as sets.
pub(crate) fn same_set(a: &[String], b: &[String]) -> bool {
    a.iter().all(|v| b.contains(v)) && b.iter().all(|v| a.contains(v))
}

/// One side is a subset of the other.
pub(crate) fn nested(a: &[String], b: &[String]) -> bool {
    a.iter().all(|v| b.contains(v)) || b.iter().all(|v| a.contains(v))
}

/// Append values from `other` not already in `target`, keeping order.
pub(crate) fn union_into(target: &mut Vec<String>, other: impl IntoIterator<Item = String>) {
    for value in other {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}
