//! Hand-authored corrections applied to the compacted table.
//!
//! Each patch is a literal business rule with a narrow fingerprint. Patches
//! run in list order after compaction, must be idempotent, and a patch whose
//! fingerprint finds nothing is a no-op: exports drift, patches do not.

use std::fmt;

use tracing::debug;

use crate::rule::{BehandlingStatus, CompactedRule, Flag, Forvaltning, union_into};
use crate::table::CompactedTable;
use crate::vocabulary::{APPEAL, ESTABLISHMENT, REVISION, WITHDRAWAL};

/// Which buckets a patch looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Bucket(&'static str),
    AllBuckets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterCodeCondition {
    /// The rule offers exactly this one code.
    Only(&'static str),
    /// The rule offers this code, possibly among others.
    Includes(&'static str),
}

/// Conditions a rule must meet for a transform to apply. Unset fields are
/// not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub verdict_type: Option<&'static str>,
    pub application_type: Option<&'static str>,
    pub application_origin: Option<&'static str>,
    pub behandling_status: Option<BehandlingStatus>,
    pub forvaltning: Option<Forvaltning>,
    pub letter_codes: Option<LetterCodeCondition>,
}

impl Fingerprint {
    pub fn matches(&self, rule: &CompactedRule) -> bool {
        fn has(values: &[String], wanted: &str) -> bool {
            values.iter().any(|v| v == wanted)
        }

        self.verdict_type
            .is_none_or(|v| has(&rule.verdict_type, v))
            && self
                .application_type
                .is_none_or(|t| has(&rule.application_type, t))
            && self
                .application_origin
                .is_none_or(|o| has(&rule.application_origin, o))
            && self
                .behandling_status
                .is_none_or(|s| rule.behandling_status == s)
            && self.forvaltning.is_none_or(|f| rule.forvaltning == f)
            && self.letter_codes.is_none_or(|c| match c {
                LetterCodeCondition::Only(code) => {
                    rule.letter_codes.len() == 1 && rule.letter_codes[0] == code
                }
                LetterCodeCondition::Includes(code) => has(&rule.letter_codes, code),
            })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(v) = self.verdict_type {
            parts.push(format!("verdictType={v}"));
        }
        if let Some(t) = self.application_type {
            parts.push(format!("applicationType={t}"));
        }
        if let Some(o) = self.application_origin {
            parts.push(format!("applicationOrigin={o}"));
        }
        if let Some(s) = self.behandling_status {
            parts.push(format!("behandlingStatus={}", s.as_str()));
        }
        if let Some(fv) = self.forvaltning {
            parts.push(format!("forvaltning={}", fv.as_str()));
        }
        match self.letter_codes {
            Some(LetterCodeCondition::Only(code)) => parts.push(format!("letterCodes=[{code}]")),
            Some(LetterCodeCondition::Includes(code)) => {
                parts.push(format!("letterCodes∋{code}"))
            }
            None => {}
        }
        if parts.is_empty() {
            write!(f, "any rule")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// A change applied to every rule matching a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Remove a value from both verdict type and application type.
    Strip(&'static str),
    /// Add letter codes that must accompany the rule's template.
    AddLetterCodes(&'static [&'static str]),
}

impl Transform {
    /// Apply to `rule`, returning whether anything changed.
    pub fn apply(&self, rule: &mut CompactedRule) -> bool {
        match self {
            Transform::Strip(value) => {
                let before = rule.verdict_type.len() + rule.application_type.len();
                rule.verdict_type.retain(|v| v != value);
                rule.application_type.retain(|v| v != value);
                before != rule.verdict_type.len() + rule.application_type.len()
            }
            Transform::AddLetterCodes(codes) => {
                let before = rule.letter_codes.len();
                union_into(&mut rule.letter_codes, codes.iter().map(|c| c.to_string()));
                before != rule.letter_codes.len()
            }
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Strip(value) => write!(f, "strip {value}"),
            Transform::AddLetterCodes(codes) => write!(f, "add {}", codes.join(", ")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PatchAction {
    /// Insert a synthetic rule unless an equal rule is already present.
    Insert(fn() -> CompactedRule),
    Transform { when: Fingerprint, then: Transform },
}

#[derive(Debug, Clone)]
pub struct ManualPatch {
    pub name: &'static str,
    /// ISO date the correction was introduced.
    pub introduced: &'static str,
    pub scope: Scope,
    pub action: PatchAction,
}

impl ManualPatch {
    /// Apply to `table`, returning the number of rules inserted or changed.
    pub fn apply(&self, table: &mut CompactedTable) -> usize {
        let buckets: Vec<&mut Vec<CompactedRule>> = match self.scope {
            Scope::Bucket(name) => table.bucket_mut(name).into_iter().collect(),
            Scope::AllBuckets => table.buckets_mut().map(|(_, rules)| rules).collect(),
        };

        let mut affected = 0;
        for rules in buckets {
            match &self.action {
                PatchAction::Insert(build) => {
                    let rule = build();
                    if !rules.contains(&rule) {
                        rules.push(rule);
                        affected += 1;
                    }
                }
                PatchAction::Transform { when, then } => {
                    for rule in rules.iter_mut().filter(|r| when.matches(r)) {
                        if then.apply(rule) {
                            affected += 1;
                        }
                    }
                }
            }
        }
        affected
    }
}

/// Apply patches in order.
pub fn apply_patches(table: &mut CompactedTable, patches: &[ManualPatch]) {
    for patch in patches {
        let affected = patch.apply(table);
        debug!(patch = patch.name, affected, "manual patch applied");
    }
}

// ── The published corrections ──

const FORSKUDD: &str = "FORSKUDD";
const BIDRAG: &str = "BIDRAG";

/// Withdrawn decisions fell back to the notice template after the
/// 2023-09-20 export; they need the decision letter.
fn withdrawal_decision_rule() -> CompactedRule {
    CompactedRule {
        stonad_type: Some(FORSKUDD.into()),
        engangsbelop_type: None,
        application_type: vec![WITHDRAWAL.into()],
        verdict_type: vec![WITHDRAWAL.into()],
        application_origin: vec!["NAV".into()],
        is_non_recovery_decision: Flag::Any,
        behandling_status: BehandlingStatus::Issued,
        forvaltning: Forvaltning::Standard,
        letter_codes: vec!["BI01G04".into()],
    }
}

/// The corrections in the order they must run.
pub fn standard_patches() -> Vec<ManualPatch> {
    vec![
        ManualPatch {
            name: "withdrawal-decision-letter",
            introduced: "2023-09-20",
            scope: Scope::Bucket(FORSKUDD),
            action: PatchAction::Insert(withdrawal_decision_rule),
        },
        ManualPatch {
            name: "appeal-notice-without-revision",
            introduced: "2023-09-20",
            scope: Scope::Bucket(BIDRAG),
            action: PatchAction::Transform {
                when: Fingerprint {
                    verdict_type: Some(APPEAL),
                    application_origin: Some("RECIPIENT"),
                    behandling_status: Some(BehandlingStatus::NotIssued),
                    letter_codes: Some(LetterCodeCondition::Only("BI01S64")),
                    ..Default::default()
                },
                then: Transform::Strip(REVISION),
            },
        },
        ManualPatch {
            name: "establishment-notice-attachments",
            introduced: "2023-11-02",
            scope: Scope::Bucket(BIDRAG),
            action: PatchAction::Transform {
                when: Fingerprint {
                    verdict_type: Some(ESTABLISHMENT),
                    application_origin: Some("PAYER"),
                    behandling_status: Some(BehandlingStatus::NotIssued),
                    letter_codes: Some(LetterCodeCondition::Includes("BI01S21")),
                    ..Default::default()
                },
                then: Transform::AddLetterCodes(&["BI01S22", "BI01S23"]),
            },
        },
        ManualPatch {
            name: "appeals-unit-forwarding-letters",
            introduced: "2024-01-15",
            scope: Scope::AllBuckets,
            action: PatchAction::Transform {
                when: Fingerprint {
                    application_type: Some(APPEAL),
                    behandling_status: Some(BehandlingStatus::NotIssued),
                    forvaltning: Some(Forvaltning::Appeals),
                    letter_codes: Some(LetterCodeCondition::Includes("BI01K50")),
                    ..Default::default()
                },
                then: Transform::AddLetterCodes(&["BI01K51", "BI01K52"]),
            },
        },
    ]
}
