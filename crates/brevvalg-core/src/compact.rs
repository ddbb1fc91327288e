//! Multi-pass compaction of raw letter records into a decision table.
//!
//! # Algorithm
//!
//! Each pass walks its input in order and keeps an output list. For every
//! rule it scans the output *linearly* for the first rule satisfying the
//! pass predicate and merges into it; with no candidate the rule is appended.
//! The first candidate wins, there is no backtracking, and merged entries are
//! never revisited. The result depends on encounter order and on the order of
//! the passes, so neither may be changed without changing the published table:
//!
//! 1. exact type/origin, all flags equal → union letter codes
//! 2. exact type/origin/codes, flags equal but appeals unit → appeals unit := any
//! 3. exact type/origin/codes, flags equal but manual → manual := any
//! 4. nested type/origin/codes, appeals/issued/non-recovery equal → union types and verdicts
//! 5. nested origin/codes, appeals/issued/non-recovery equal → union origins
//! 6. exact type/origin, all flags equal (wildcards included) → union letter codes
//!
//! Passes 2, 4, 5 and 6 never merge a non-recovery decision on an appeal
//! (see [`MergedRule::is_standalone_appeal`]).

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::alias::collapse_aliases;
use crate::ingest::RawLetterRecord;
use crate::patch::{ManualPatch, apply_patches, standard_patches};
use crate::rule::{CompactedRule, Flag, MergedRule, nested, same_set, union_into};
use crate::table::CompactedTable;

/// One merge pass: a predicate deciding whether an incoming rule may merge
/// into an accumulated rule, and the merge itself.
#[derive(Clone, Copy)]
pub struct MergePass {
    pub name: &'static str,
    /// Whether non-recovery appeal decisions are kept standalone.
    pub keeps_appeals_standalone: bool,
    matches: fn(&MergedRule, &MergedRule) -> bool,
    merge: fn(&mut MergedRule, MergedRule),
}

impl std::fmt::Debug for MergePass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergePass")
            .field("name", &self.name)
            .field("keeps_appeals_standalone", &self.keeps_appeals_standalone)
            .finish()
    }
}

impl MergePass {
    /// Run the pass over `rules`, returning the merged list.
    pub fn apply(&self, rules: Vec<MergedRule>) -> Vec<MergedRule> {
        let mut out: Vec<MergedRule> = Vec::with_capacity(rules.len());

        for rule in rules {
            if self.keeps_appeals_standalone && rule.is_standalone_appeal() {
                out.push(rule);
                continue;
            }

            // Linear scan, first match wins.
            let target = out.iter_mut().find(|candidate| {
                !(self.keeps_appeals_standalone && candidate.is_standalone_appeal())
                    && (self.matches)(candidate, &rule)
            });

            match target {
                Some(target) => (self.merge)(target, rule),
                None => out.push(rule),
            }
        }

        out
    }
}

// ── Predicates ──

fn all_flags_equal(a: &MergedRule, b: &MergedRule) -> bool {
    a.is_appeals_unit == b.is_appeals_unit
        && a.is_non_recovery_decision == b.is_non_recovery_decision
        && a.is_decision_issued == b.is_decision_issued
        && a.is_manually_calculated == b.is_manually_calculated
}

fn exact_type_and_origin(a: &MergedRule, b: &MergedRule) -> bool {
    same_set(&a.application_type, &b.application_type)
        && same_set(&a.application_origin, &b.application_origin)
}

fn exact_type_origin_and_codes(a: &MergedRule, b: &MergedRule) -> bool {
    exact_type_and_origin(a, b) && same_set(&a.letter_codes, &b.letter_codes)
}

fn appeals_issued_and_recovery_equal(a: &MergedRule, b: &MergedRule) -> bool {
    a.is_appeals_unit == b.is_appeals_unit
        && a.is_decision_issued == b.is_decision_issued
        && a.is_non_recovery_decision == b.is_non_recovery_decision
}

fn same_letter_context(a: &MergedRule, b: &MergedRule) -> bool {
    exact_type_and_origin(a, b) && all_flags_equal(a, b)
}

fn same_except_appeals_unit(a: &MergedRule, b: &MergedRule) -> bool {
    exact_type_origin_and_codes(a, b)
        && a.is_non_recovery_decision == b.is_non_recovery_decision
        && a.is_decision_issued == b.is_decision_issued
        && a.is_manually_calculated == b.is_manually_calculated
}

fn same_except_manual(a: &MergedRule, b: &MergedRule) -> bool {
    exact_type_origin_and_codes(a, b)
        && a.is_appeals_unit == b.is_appeals_unit
        && a.is_non_recovery_decision == b.is_non_recovery_decision
        && a.is_decision_issued == b.is_decision_issued
}

fn nested_type_origin_and_codes(a: &MergedRule, b: &MergedRule) -> bool {
    nested(&a.application_type, &b.application_type)
        && nested(&a.application_origin, &b.application_origin)
        && nested(&a.letter_codes, &b.letter_codes)
        && appeals_issued_and_recovery_equal(a, b)
}

fn nested_origin_and_codes(a: &MergedRule, b: &MergedRule) -> bool {
    nested(&a.application_origin, &b.application_origin)
        && nested(&a.letter_codes, &b.letter_codes)
        && appeals_issued_and_recovery_equal(a, b)
}

// ── Merges ──

fn union_letter_codes(target: &mut MergedRule, rule: MergedRule) {
    union_into(&mut target.letter_codes, rule.letter_codes);
}

fn widen_appeals_unit(target: &mut MergedRule, _rule: MergedRule) {
    target.is_appeals_unit = Flag::Any;
}

fn widen_manual(target: &mut MergedRule, _rule: MergedRule) {
    target.is_manually_calculated = Flag::Any;
}

fn union_types(target: &mut MergedRule, rule: MergedRule) {
    union_into(&mut target.application_type, rule.application_type);
    union_into(&mut target.verdict_type, rule.verdict_type);
}

fn union_origins(target: &mut MergedRule, rule: MergedRule) {
    union_into(&mut target.application_origin, rule.application_origin);
}

pub const LETTER_CODES: MergePass = MergePass {
    name: "letter-codes",
    keeps_appeals_standalone: false,
    matches: same_letter_context,
    merge: union_letter_codes,
};

pub const APPEALS_UNIT: MergePass = MergePass {
    name: "appeals-unit",
    keeps_appeals_standalone: true,
    matches: same_except_appeals_unit,
    merge: widen_appeals_unit,
};

pub const MANUAL_CALCULATION: MergePass = MergePass {
    name: "manual-calculation",
    keeps_appeals_standalone: false,
    matches: same_except_manual,
    merge: widen_manual,
};

pub const APPLICATION_TYPES: MergePass = MergePass {
    name: "application-types",
    keeps_appeals_standalone: true,
    matches: nested_type_origin_and_codes,
    merge: union_types,
};

pub const APPLICATION_ORIGINS: MergePass = MergePass {
    name: "application-origins",
    keeps_appeals_standalone: true,
    matches: nested_origin_and_codes,
    merge: union_origins,
};

pub const CONSOLIDATION: MergePass = MergePass {
    name: "consolidation",
    keeps_appeals_standalone: true,
    matches: same_letter_context,
    merge: union_letter_codes,
};

/// The published pass order.
pub const STANDARD_PASSES: [MergePass; 6] = [
    LETTER_CODES,
    APPEALS_UNIT,
    MANUAL_CALCULATION,
    APPLICATION_TYPES,
    APPLICATION_ORIGINS,
    CONSOLIDATION,
];

/// Wrap records as merge rules, numbering their lineage by input position.
pub fn seed(records: Vec<RawLetterRecord>) -> Vec<MergedRule> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| MergedRule::from_record(i, record))
        .collect()
}

/// Run `passes` in order, returning the output of every pass.
pub fn run_stages(passes: &[MergePass], rules: Vec<MergedRule>) -> Vec<Vec<MergedRule>> {
    let mut stages = Vec::with_capacity(passes.len());
    let mut current = rules;
    for pass in passes {
        current = pass.apply(current);
        stages.push(current.clone());
    }
    stages
}

/// Run `passes` in order.
pub fn run_passes(passes: &[MergePass], rules: Vec<MergedRule>) -> Vec<MergedRule> {
    passes.iter().fold(rules, |current, pass| {
        let before = current.len();
        let merged = pass.apply(current);
        debug!(pass = pass.name, before, after = merged.len(), "merge pass");
        merged
    })
}

/// Finalise a merged rule: derive status and authority, drop merge-only
/// verdicts and bookkeeping, collapse letter-code aliases.
pub fn finalize(rule: MergedRule) -> CompactedRule {
    let mut compacted = rule.into_compacted();
    collapse_aliases(&mut compacted.letter_codes);
    compacted
}

/// The full build-time pipeline: passes, finalisation, manual patches.
#[derive(Debug, Clone)]
pub struct Compactor {
    passes: Vec<MergePass>,
    patches: Vec<ManualPatch>,
}

impl Default for Compactor {
    fn default() -> Self {
        Self::standard()
    }
}

impl Compactor {
    /// The published pipeline.
    pub fn standard() -> Self {
        Self {
            passes: STANDARD_PASSES.to_vec(),
            patches: standard_patches(),
        }
    }

    /// Replace the pass sequence. Used to evaluate alternate orderings.
    pub fn with_passes(mut self, passes: Vec<MergePass>) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_patches(mut self, patches: Vec<ManualPatch>) -> Self {
        self.patches = patches;
        self
    }

    pub fn patches(&self) -> &[ManualPatch] {
        &self.patches
    }

    /// Compact one case category's records into finalised rules.
    pub fn compact_category(&self, records: Vec<RawLetterRecord>) -> Vec<(String, CompactedRule)> {
        run_passes(&self.passes, seed(records))
            .into_iter()
            .map(|rule| (rule.behavior_type().to_string(), finalize(rule)))
            .collect()
    }

    /// Compact grouped records and apply the manual patches.
    pub fn compact(&self, groups: BTreeMap<String, Vec<RawLetterRecord>>) -> CompactedTable {
        let mut table = CompactedTable::default();
        let mut input = 0usize;

        for (category, records) in groups {
            input += records.len();
            let rules = self.compact_category(records);
            debug!(category = %category, rules = rules.len(), "compacted category");
            for (behavior_type, rule) in rules {
                table.push(behavior_type, rule);
            }
        }

        apply_patches(&mut table, &self.patches);

        info!(
            records = input,
            buckets = table.len(),
            rules = table.rule_count(),
            "compacted decision table"
        );
        table
    }
}
