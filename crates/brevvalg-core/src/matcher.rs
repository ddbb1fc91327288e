//! Runtime letter-code selection over a compacted table.

use serde::{Deserialize, Serialize};

use crate::rule::{CompactedRule, IssuedDecision};
use crate::table::CompactedTable;
use crate::vocabulary::OWN_INITIATIVE;

/// A partial case context. Absent fields are not checked, except `decision`
/// where absence means no decision has been issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Query {
    pub behavior_type: Option<String>,
    pub application_type: Option<String>,
    pub verdict_type: Option<String>,
    pub application_origin: Option<String>,
    pub decision: Option<IssuedDecision>,
    pub is_non_recovery_decision: Option<bool>,
}

impl CompactedRule {
    /// Whether this rule applies to `query` for a caller in `enhet`.
    pub fn matches(&self, query: &Query, enhet: Option<&str>) -> bool {
        query
            .is_non_recovery_decision
            .is_none_or(|v| self.is_non_recovery_decision.admits(v))
            && query
                .application_origin
                .as_ref()
                .is_none_or(|o| self.application_origin.contains(o))
            && self.forvaltning.admits(enhet)
            && self.behandling_status.admits(query.decision)
            && self.matches_kind(query)
    }

    /// Own-initiative cases are matched on application type, everything else
    /// on verdict type.
    fn matches_kind(&self, query: &Query) -> bool {
        if query.application_type.as_deref() == Some(OWN_INITIATIVE) {
            return self.application_type.iter().any(|t| t == OWN_INITIATIVE);
        }
        query
            .verdict_type
            .as_ref()
            .is_none_or(|v| self.verdict_type.contains(v))
    }
}

/// Letter codes offered by every rule matching `query`, de-duplicated in
/// encounter order. Without a behavior type all buckets are searched in key
/// order.
pub fn matching_letter_codes(
    table: &CompactedTable,
    query: &Query,
    enhet: Option<&str>,
) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    let mut collect = |rules: &[CompactedRule]| {
        for rule in rules.iter().filter(|r| r.matches(query, enhet)) {
            for code in &rule.letter_codes {
                if !codes.contains(code) {
                    codes.push(code.clone());
                }
            }
        }
    };

    match &query.behavior_type {
        Some(behavior_type) => collect(table.rules(behavior_type)),
        None => table.buckets().for_each(|(_, rules)| collect(rules)),
    }
    codes
}

// ── Template metadata ──

/// Metadata for a letter template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMeta {
    pub code: String,
    pub title: String,
    /// Offered whenever the behavior type matches, regardless of rules.
    #[serde(default)]
    pub auto_include: bool,
    /// Behavior types the auto-include applies to. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior_types: Vec<String>,
}

impl TemplateMeta {
    fn auto_included_for(&self, behavior_type: Option<&str>) -> bool {
        self.auto_include
            && (self.behavior_types.is_empty()
                || behavior_type.is_some_and(|b| self.behavior_types.iter().any(|t| t == b)))
    }
}

/// Source of template metadata, keyed by letter code.
pub trait TemplateCatalog {
    fn template(&self, code: &str) -> Option<&TemplateMeta>;

    /// Codes flagged for automatic inclusion for `behavior_type`.
    fn auto_included(&self, behavior_type: Option<&str>) -> Vec<String>;
}

/// In-memory catalog, typically loaded from a JSON array of [`TemplateMeta`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    templates: Vec<TemplateMeta>,
}

impl StaticCatalog {
    pub fn new(templates: Vec<TemplateMeta>) -> Self {
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateCatalog for StaticCatalog {
    fn template(&self, code: &str) -> Option<&TemplateMeta> {
        self.templates.iter().find(|t| t.code == code)
    }

    fn auto_included(&self, behavior_type: Option<&str>) -> Vec<String> {
        self.templates
            .iter()
            .filter(|t| t.auto_included_for(behavior_type))
            .map(|t| t.code.clone())
            .collect()
    }
}

/// A letter offered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterOption {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub auto_included: bool,
}

/// The query API: a compacted table paired with a template catalog.
///
/// Both are read-only after construction; a selector can be shared across
/// threads when its catalog can.
#[derive(Debug, Clone)]
pub struct DocumentSelector<C> {
    table: CompactedTable,
    catalog: C,
}

impl<C: TemplateCatalog> DocumentSelector<C> {
    pub fn new(table: CompactedTable, catalog: C) -> Self {
        Self { table, catalog }
    }

    /// Matching letter codes followed by auto-included templates.
    pub fn letter_codes(&self, query: &Query, enhet: Option<&str>) -> Vec<String> {
        self.select(query, enhet).into_iter().map(|o| o.code).collect()
    }

    /// Matching letters with catalog titles. A behavior type missing from the
    /// table yields only the auto-included templates.
    pub fn select(&self, query: &Query, enhet: Option<&str>) -> Vec<LetterOption> {
        let matched = matching_letter_codes(&self.table, query, enhet);
        let auto = self.catalog.auto_included(query.behavior_type.as_deref());

        let mut options: Vec<LetterOption> = matched
            .into_iter()
            .map(|code| self.option(code, false))
            .collect();
        for code in auto {
            if !options.iter().any(|o| o.code == code) {
                options.push(self.option(code, true));
            }
        }
        options
    }

    fn option(&self, code: String, auto_included: bool) -> LetterOption {
        let title = self.catalog.template(&code).map(|t| t.title.clone());
        LetterOption {
            code,
            title,
            auto_included,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{BehandlingStatus, Flag, Forvaltning};
    use crate::vocabulary::APPEALS_UNIT_ENHETER;

    fn rule(codes: &[&str]) -> CompactedRule {
        CompactedRule {
            stonad_type: Some("BIDRAG".into()),
            engangsbelop_type: None,
            application_type: vec!["CHANGE".into()],
            verdict_type: vec!["CHANGE".into()],
            application_origin: vec!["PAYER".into()],
            is_non_recovery_decision: Flag::No,
            behandling_status: BehandlingStatus::NotIssued,
            forvaltning: Forvaltning::Standard,
            letter_codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn query() -> Query {
        Query {
            behavior_type: Some("BIDRAG".into()),
            ..Default::default()
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            TemplateMeta {
                code: "BI01S02".into(),
                title: "Fritekstbrev".into(),
                auto_include: true,
                behavior_types: vec![],
            },
            TemplateMeta {
                code: "BI01S10".into(),
                title: "Kopiforside".into(),
                auto_include: true,
                behavior_types: vec!["FORSKUDD".into()],
            },
            TemplateMeta {
                code: "BI01S21".into(),
                title: "Varsel om fastsettelse".into(),
                auto_include: false,
                behavior_types: vec![],
            },
        ])
    }

    // ── Authority ──

    #[test]
    fn either_authority_matches_any_enhet() {
        let mut r = rule(&["BI01S21"]);
        r.forvaltning = Forvaltning::Either;
        for enhet in [None, Some("4806"), Some(APPEALS_UNIT_ENHETER[0])] {
            assert!(r.matches(&query(), enhet), "enhet {enhet:?}");
        }
    }

    #[test]
    fn appeals_authority_requires_appeals_enhet() {
        let mut r = rule(&["BI01S21"]);
        r.forvaltning = Forvaltning::Appeals;
        assert!(r.matches(&query(), Some("4291")));
        assert!(!r.matches(&query(), Some("4806")));
        assert!(!r.matches(&query(), None));
    }

    #[test]
    fn standard_authority_always_matches() {
        let r = rule(&["BI01S21"]);
        assert!(r.matches(&query(), Some("4291")));
        assert!(r.matches(&query(), None));
    }

    // ── Status ──

    #[test]
    fn not_issued_rule_requires_no_decision() {
        let r = rule(&["BI01S21"]);
        assert!(r.matches(&query(), None));
        let q = Query {
            decision: Some(IssuedDecision::Manual),
            ..query()
        };
        assert!(!r.matches(&q, None));
    }

    #[test]
    fn issued_rule_accepts_either_calculation() {
        let mut r = rule(&["BI01G01"]);
        r.behandling_status = BehandlingStatus::Issued;
        for decision in [IssuedDecision::Manual, IssuedDecision::Calculated] {
            let q = Query {
                decision: Some(decision),
                ..query()
            };
            assert!(r.matches(&q, None));
        }
        assert!(!r.matches(&query(), None));
    }

    #[test]
    fn calculated_rule_rejects_manual_decision() {
        let mut r = rule(&["BI01G01"]);
        r.behandling_status = BehandlingStatus::IssuedCalculated;
        let q = Query {
            decision: Some(IssuedDecision::Manual),
            ..query()
        };
        assert!(!r.matches(&q, None));
    }

    // ── Flags, origin, kind ──

    #[test]
    fn wildcard_non_recovery_matches_both() {
        let mut r = rule(&["BI01S21"]);
        r.is_non_recovery_decision = Flag::Any;
        for v in [true, false] {
            let q = Query {
                is_non_recovery_decision: Some(v),
                ..query()
            };
            assert!(r.matches(&q, None));
        }
        r.is_non_recovery_decision = Flag::No;
        let q = Query {
            is_non_recovery_decision: Some(true),
            ..query()
        };
        assert!(!r.matches(&q, None));
    }

    #[test]
    fn origin_must_be_listed() {
        let r = rule(&["BI01S21"]);
        let q = Query {
            application_origin: Some("RECIPIENT".into()),
            ..query()
        };
        assert!(!r.matches(&q, None));
    }

    #[test]
    fn verdict_membership() {
        let r = rule(&["BI01S21"]);
        let change = Query {
            verdict_type: Some("CHANGE".into()),
            ..query()
        };
        let appeal = Query {
            verdict_type: Some("APPEAL".into()),
            ..query()
        };
        assert!(r.matches(&change, None));
        assert!(!r.matches(&appeal, None));
    }

    #[test]
    fn own_initiative_bypasses_verdict() {
        let mut r = rule(&["BI01S30"]);
        r.application_type = vec![OWN_INITIATIVE.into(), "CHANGE".into()];
        let q = Query {
            application_type: Some(OWN_INITIATIVE.into()),
            verdict_type: Some("APPEAL".into()),
            ..query()
        };
        assert!(r.matches(&q, None));

        let plain = rule(&["BI01S21"]);
        assert!(!plain.matches(&q, None));
    }

    // ── Selection ──

    #[test]
    fn union_of_matching_rules_is_deduplicated() {
        let mut table = CompactedTable::new();
        table.push("BIDRAG", rule(&["BI01S21", "BI01S22"]));
        table.push("BIDRAG", rule(&["BI01S22", "BI01S23"]));
        let mut appeals_only = rule(&["BI01K50"]);
        appeals_only.forvaltning = Forvaltning::Appeals;
        table.push("BIDRAG", appeals_only);

        let codes = matching_letter_codes(&table, &query(), Some("4806"));
        assert_eq!(codes, vec!["BI01S21", "BI01S22", "BI01S23"]);
    }

    #[test]
    fn selector_appends_auto_included_templates() {
        let mut table = CompactedTable::new();
        table.push("BIDRAG", rule(&["BI01S21"]));
        let selector = DocumentSelector::new(table, catalog());

        let options = selector.select(&query(), None);
        assert_eq!(
            options,
            vec![
                LetterOption {
                    code: "BI01S21".into(),
                    title: Some("Varsel om fastsettelse".into()),
                    auto_included: false,
                },
                LetterOption {
                    code: "BI01S02".into(),
                    title: Some("Fritekstbrev".into()),
                    auto_included: true,
                },
            ]
        );
    }

    #[test]
    fn auto_include_is_scoped_by_behavior_type() {
        let selector = DocumentSelector::new(CompactedTable::new(), catalog());
        let forskudd = Query {
            behavior_type: Some("FORSKUDD".into()),
            ..Default::default()
        };
        assert_eq!(
            selector.letter_codes(&forskudd, None),
            vec!["BI01S02", "BI01S10"]
        );
        assert_eq!(selector.letter_codes(&Query::default(), None), vec!["BI01S02"]);
    }

    #[test]
    fn missing_behavior_type_yields_only_auto_included() {
        let mut table = CompactedTable::new();
        table.push("BIDRAG", rule(&["BI01S21"]));
        let selector = DocumentSelector::new(table, catalog());
        let q = Query {
            behavior_type: Some("ETTERGIVELSE".into()),
            ..Default::default()
        };
        assert_eq!(selector.letter_codes(&q, None), vec!["BI01S02"]);
    }

    #[test]
    fn unknown_code_has_no_title() {
        let mut table = CompactedTable::new();
        table.push("BIDRAG", rule(&["BI01Q99"]));
        let selector = DocumentSelector::new(table, StaticCatalog::default());
        let options = selector.select(&query(), None);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].title, None);
    }

    #[test]
    fn query_deserialises_from_camel_case() {
        let q: Query = serde_json::from_str(
            r#"{"behaviorType":"BIDRAG","decision":"CALCULATED","isNonRecoveryDecision":false}"#,
        )
        .unwrap();
        assert_eq!(q.behavior_type.as_deref(), Some("BIDRAG"));
        assert_eq!(q.decision, Some(IssuedDecision::Calculated));
        assert_eq!(q.is_non_recovery_decision, Some(false));
        assert_eq!(q.verdict_type, None);
    }

    #[test]
    fn selector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocumentSelector<StaticCatalog>>();
    }
}
