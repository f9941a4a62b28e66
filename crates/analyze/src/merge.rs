//! Grouping solver and fast-path records that describe the same finding.
//!
//! Two records belong to one group when they share the rule key, the
//! remediation text and the primary subject. A system and a connection
//! with the same id are different subjects. Data references of the group's
//! members are collected in order of first appearance.

use std::collections::{BTreeMap, HashMap};

use archcheck_model::RuleKey;
use serde::Serialize;

use crate::classify::{Subject, ThreatMap, ViolationRecord};

/// Records merged under one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedViolationGroup {
    /// The first record of the group.
    pub primary: ViolationRecord,
    /// Positions in `solver ++ fast` for this rule.
    pub member_indices: Vec<usize>,
    /// Distinct data assets referenced by any member.
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergedThreats {
    pub by_rule: BTreeMap<RuleKey, Vec<MergedViolationGroup>>,
    pub raw_count: usize,
    pub group_count: usize,
}

/// Union both streams per rule and merge duplicates.
pub fn merge(solver: &ThreatMap, fast: &ThreatMap) -> MergedThreats {
    let mut out = MergedThreats::default();

    for rule in RuleKey::ALL {
        let records = solver
            .get(&rule)
            .into_iter()
            .chain(fast.get(&rule))
            .flatten();

        let mut groups: Vec<MergedViolationGroup> = Vec::new();
        let mut index_of: HashMap<(&Subject, &str), usize> = HashMap::new();
        for (i, record) in records.enumerate() {
            out.raw_count += 1;
            let key = (&record.subject, record.remediation.as_str());
            let g = *index_of.entry(key).or_insert_with(|| {
                groups.push(MergedViolationGroup {
                    primary: record.clone(),
                    member_indices: Vec::new(),
                    data: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[g];
            group.member_indices.push(i);
            if let Some(d) = &record.data {
                if !group.data.contains(d) {
                    group.data.push(d.clone());
                }
            }
        }

        out.group_count += groups.len();
        out.by_rule.insert(rule, groups);
    }

    tracing::debug!(
        raw = out.raw_count,
        groups = out.group_count,
        "violations merged"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(rule: RuleKey, id: &str, data: Option<&str>) -> ViolationRecord {
        ViolationRecord::new(
            rule,
            Subject::Connection(id.to_string()),
            data.map(str::to_string),
        )
    }

    fn sys(rule: RuleKey, id: &str) -> ViolationRecord {
        ViolationRecord::new(rule, Subject::System(id.to_string()), None)
    }

    fn map(records: Vec<ViolationRecord>) -> ThreatMap {
        let mut m = ThreatMap::new();
        for r in records {
            m.entry(r.rule).or_default().push(r);
        }
        m
    }

    #[test]
    fn same_connection_merges_data() {
        let solver = map(vec![
            conn(RuleKey::FlowViolations, "c1", Some("d1")),
            conn(RuleKey::FlowViolations, "c1", Some("d2")),
            conn(RuleKey::FlowViolations, "c1", Some("d1")),
        ]);
        let merged = merge(&solver, &ThreatMap::new());
        let groups = &merged.by_rule[&RuleKey::FlowViolations];
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].data, vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(groups[0].member_indices, vec![0, 1, 2]);
        assert_eq!(merged.raw_count, 3);
        assert_eq!(merged.group_count, 1);
    }

    #[test]
    fn system_and_connection_with_same_id_stay_apart() {
        let mut a = sys(RuleKey::FlowViolations, "x");
        a.remediation = "same".to_string();
        let mut b = conn(RuleKey::FlowViolations, "x", None);
        b.remediation = "same".to_string();
        let merged = merge(&map(vec![a, b]), &ThreatMap::new());
        assert_eq!(merged.by_rule[&RuleKey::FlowViolations].len(), 2);
    }

    #[test]
    fn different_remediation_stays_apart() {
        let a = conn(RuleKey::FlowViolations, "c1", Some("d1"));
        let mut b = conn(RuleKey::FlowViolations, "c1", Some("d2"));
        b.remediation.push_str(" (custom)");
        let merged = merge(&map(vec![a, b]), &ThreatMap::new());
        assert_eq!(merged.group_count, 2);
    }

    #[test]
    fn indices_span_solver_then_fast() {
        let solver = map(vec![sys(RuleKey::ShadowIt, "s1")]);
        let fast = map(vec![sys(RuleKey::ShadowIt, "s2"), sys(RuleKey::ShadowIt, "s1")]);
        let merged = merge(&solver, &fast);
        let groups = &merged.by_rule[&RuleKey::ShadowIt];
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].primary.subject, Subject::System("s1".to_string()));
        assert_eq!(groups[0].member_indices, vec![0, 2]);
        assert_eq!(groups[1].member_indices, vec![1]);
    }

    #[test]
    fn merging_is_idempotent() {
        let records = vec![
            conn(RuleKey::ContentControlFailures, "c1", Some("d1")),
            conn(RuleKey::ContentControlFailures, "c2", Some("d1")),
            conn(RuleKey::ContentControlFailures, "c1", Some("d3")),
            sys(RuleKey::WeakSession, "s1"),
        ];
        let once = merge(&map(records.clone()), &ThreatMap::new());
        let doubled: Vec<ViolationRecord> = records.iter().chain(records.iter()).cloned().collect();
        let twice = merge(&map(doubled), &ThreatMap::new());

        assert_eq!(once.group_count, twice.group_count);
        assert_eq!(twice.raw_count, 2 * once.raw_count);
        for rule in RuleKey::ALL {
            let a: Vec<_> = once.by_rule[&rule].iter().map(|g| (&g.primary, &g.data)).collect();
            let b: Vec<_> = twice.by_rule[&rule].iter().map(|g| (&g.primary, &g.data)).collect();
            assert_eq!(a, b, "{}", rule);
        }
    }

    #[test]
    fn every_rule_has_an_entry() {
        let merged = merge(&ThreatMap::new(), &ThreatMap::new());
        assert_eq!(merged.by_rule.len(), RuleKey::ALL.len());
        assert_eq!(merged.group_count, 0);
    }
}
