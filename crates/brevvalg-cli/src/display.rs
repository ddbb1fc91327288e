//! Vertical card display for compacted rules, selections and patches.

use brevvalg_core::IngestReport;
use brevvalg_core::patch::{ManualPatch, PatchAction, Scope};
use brevvalg_core::{CompactedRule, CompactedTable, LetterOption};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print per-bucket rule counts, then a card per rule.
pub fn print_table(table: &CompactedTable, only: Option<&str>) {
    println!("=== Compacted table ===");
    println!("  {:<26} {}", "buckets", table.len());
    println!("  {:<26} {}", "rules", table.rule_count());
    println!();

    for (behavior_type, rules) in table.buckets() {
        if only.is_some_and(|b| b != behavior_type) {
            continue;
        }
        println!("{behavior_type} ({} rules)", rules.len());
        println!();
        for (i, rule) in rules.iter().enumerate() {
            print_rule_card(i, rule);
        }
    }
}

pub fn print_rule_card(index: usize, rule: &CompactedRule) {
    println!("  #{index}");
    for (label, value) in rule_fields(rule) {
        println!("    {label:<24} {value}");
    }
    println!();
}

pub fn print_options(options: &[LetterOption]) {
    if options.is_empty() {
        println!("(no letters)");
        return;
    }
    for option in options {
        let marker = if option.auto_included { "*" } else { " " };
        match &option.title {
            Some(title) => println!("{marker} {:<10} {title}", option.code),
            None => println!("{marker} {}", option.code),
        }
    }
}

pub fn print_patch(patch: &ManualPatch) {
    println!("=== {} ===", patch.name);
    println!("  {:<26} {}", "introduced", patch.introduced);
    let scope = match patch.scope {
        Scope::Bucket(name) => name.to_string(),
        Scope::AllBuckets => "all buckets".to_string(),
    };
    println!("  {:<26} {}", "scope", scope);
    match &patch.action {
        PatchAction::Insert(build) => {
            println!("  {:<26} insert rule", "action");
            print_rule_card(0, &build());
        }
        PatchAction::Transform { when, then } => {
            println!("  {:<26} {}", "when", when);
            println!("  {:<26} {}", "then", then);
            println!();
        }
    }
}

pub fn print_report(report: &IngestReport) {
    println!("Ingest");
    println!("  {:<26} {}", "rows read", report.rows_read);
    println!("  {:<26} {}", "rows ignored", report.rows_ignored);
    println!("  {:<26} {}", "records", report.records);
    for (dimension, codes) in &report.passthrough {
        let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
        println!("  {:<26} {}", format!("unmapped {dimension}"), short_list(&codes));
    }
    if !report.unclassified_categories.is_empty() {
        let cats: Vec<&str> = report
            .unclassified_categories
            .iter()
            .map(String::as_str)
            .collect();
        println!("  {:<26} {}", "unclassified", short_list(&cats));
    }
    if !report.ambiguous_categories.is_empty() {
        let cats: Vec<&str> = report
            .ambiguous_categories
            .iter()
            .map(String::as_str)
            .collect();
        println!("  {:<26} {}", "ambiguous", short_list(&cats));
    }
    println!();
}

// ── Formatting ──

fn rule_fields(rule: &CompactedRule) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(stonad) = &rule.stonad_type {
        fields.push(("stonad", stonad.clone()));
    }
    if let Some(engangsbelop) = &rule.engangsbelop_type {
        fields.push(("engangsbelop", engangsbelop.clone()));
    }
    fields.push(("application type", short_list(&rule.application_type)));
    fields.push(("verdict type", short_list(&rule.verdict_type)));
    fields.push(("origin", short_list(&rule.application_origin)));
    let non_recovery = match Option::<bool>::from(rule.is_non_recovery_decision) {
        Some(true) => "yes",
        Some(false) => "no",
        None => "any",
    };
    fields.push(("non-recovery decision", non_recovery.to_string()));
    fields.push(("status", rule.behandling_status.as_str().to_string()));
    fields.push(("forvaltning", rule.forvaltning.as_str().to_string()));
    fields.push(("letters", short_list(&rule.letter_codes)));
    fields
}

fn short_list<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    let shown: Vec<&str> = items
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(AsRef::as_ref)
        .collect();
    let mut out = shown.join(", ");
    if items.len() > MAX_LIST_ITEMS {
        out.push_str(&format!(" ... and {} more", items.len() - MAX_LIST_ITEMS));
    }
    out
}
