//! The compacted decision table: behavior type → rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::CompactedRule;

/// Compacted rules bucketed by behavior type.
///
/// Buckets are kept in key order and rules in compaction order, so the
/// serialised form is stable across runs on the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactedTable {
    buckets: BTreeMap<String, Vec<CompactedRule>>,
}

impl CompactedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, behavior_type: impl Into<String>, rule: CompactedRule) {
        self.buckets
            .entry(behavior_type.into())
            .or_default()
            .push(rule);
    }

    /// Rules for a behavior type; empty when the bucket does not exist.
    pub fn rules(&self, behavior_type: &str) -> &[CompactedRule] {
        self.buckets
            .get(behavior_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn bucket_mut(&mut self, behavior_type: &str) -> Option<&mut Vec<CompactedRule>> {
        self.buckets.get_mut(behavior_type)
    }

    pub fn contains(&self, behavior_type: &str) -> bool {
        self.buckets.contains_key(behavior_type)
    }

    /// Buckets in key order.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[CompactedRule])> {
        self.buckets
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn buckets_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<CompactedRule>)> {
        self.buckets.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn behavior_types(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of rules across all buckets.
    pub fn rule_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
