//! ViolationReport -- the outward result of one analysis.

use std::collections::BTreeMap;

use archcheck_model::RuleKey;
use serde::Serialize;

use crate::classify::{ConsistencyWarning, ThreatMap, ViolationRecord};
use crate::merge::{merge, MergedViolationGroup};

/// Whether the engine contributed to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverStatus {
    /// Engine output was decoded and classified.
    Complete,
    /// Engine output was missing or malformed; fast-path results only.
    Degraded,
    /// The engine was not asked.
    Skipped,
}

impl SolverStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::Complete => "complete",
            SolverStatus::Degraded => "degraded",
            SolverStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    /// Raw records per rule. Every catalog key is present.
    pub threats: BTreeMap<RuleKey, Vec<ViolationRecord>>,
    /// Number of raw records.
    pub total_count: usize,
    pub merged: BTreeMap<RuleKey, Vec<MergedViolationGroup>>,
    pub merged_count: usize,
    pub solver_status: SolverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub spec_digest: String,
    pub warnings: Vec<ConsistencyWarning>,
}

impl ViolationReport {
    /// Assemble a report from the two record streams.
    pub fn build(solver: &ThreatMap, fast: &ThreatMap, spec_digest: impl Into<String>) -> Self {
        let merged = merge(solver, fast);
        let mut threats = BTreeMap::new();
        for rule in RuleKey::ALL {
            let records: Vec<ViolationRecord> = solver
                .get(&rule)
                .into_iter()
                .chain(fast.get(&rule))
                .flatten()
                .cloned()
                .collect();
            threats.insert(rule, records);
        }
        ViolationReport {
            threats,
            total_count: merged.raw_count,
            merged: merged.by_rule,
            merged_count: merged.group_count,
            solver_status: SolverStatus::Complete,
            degraded_reason: None,
            spec_digest: spec_digest.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<ConsistencyWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn degraded(mut self, reason: impl Into<String>) -> Self {
        self.solver_status = SolverStatus::Degraded;
        self.degraded_reason = Some(reason.into());
        self
    }

    pub fn skipped(mut self) -> Self {
        self.solver_status = SolverStatus::Skipped;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.total_count == 0
    }

    /// Records of one rule; empty if none fired.
    pub fn records(&self, rule: RuleKey) -> &[ViolationRecord] {
        self.threats.get(&rule).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Terminal summary: one block per rule that fired, then warnings.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let short = self.spec_digest.get(..12).unwrap_or(&self.spec_digest);
        out.push_str(&format!(
            "archcheck: {} violation(s) in {} group(s) [solver {}] spec {}\n",
            self.total_count,
            self.merged_count,
            self.solver_status.as_str(),
            if short.is_empty() { "-" } else { short }
        ));
        if let Some(reason) = &self.degraded_reason {
            out.push_str(&format!("  engine output unavailable: {}\n", reason));
        }

        for (rule, groups) in &self.merged {
            if groups.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{} ({})\n", rule, groups.len()));
            out.push_str(&format!("  {}\n", rule.remediation()));
            for g in groups {
                if g.data.is_empty() {
                    out.push_str(&format!("  - {}\n", g.primary.subject));
                } else {
                    out.push_str(&format!(
                        "  - {} [data: {}]\n",
                        g.primary.subject,
                        g.data.join(", ")
                    ));
                }
                if g.primary.remediation != rule.remediation() {
                    out.push_str(&format!("    {}\n", g.primary.remediation));
                }
            }
        }

        if !self.warnings.is_empty() {
            out.push_str("\nwarnings:\n");
            for w in &self.warnings {
                out.push_str(&format!("  - {}\n", w));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Subject;

    fn sample() -> ViolationReport {
        let mut solver = ThreatMap::new();
        solver.insert(
            RuleKey::FlowViolations,
            vec![
                ViolationRecord::new(
                    RuleKey::FlowViolations,
                    Subject::Connection("c1".to_string()),
                    Some("d1".to_string()),
                ),
                ViolationRecord::new(
                    RuleKey::FlowViolations,
                    Subject::Connection("c1".to_string()),
                    Some("d2".to_string()),
                ),
            ],
        );
        let mut fast = ThreatMap::new();
        fast.insert(
            RuleKey::ShadowIt,
            vec![ViolationRecord::new(
                RuleKey::ShadowIt,
                Subject::System("s1".to_string()),
                None,
            )],
        );
        ViolationReport::build(&solver, &fast, "0123456789abcdef")
    }

    #[test]
    fn counts_and_keys() {
        let r = sample();
        assert_eq!(r.total_count, 3);
        assert_eq!(r.merged_count, 2);
        assert_eq!(r.threats.len(), RuleKey::ALL.len());
        assert_eq!(r.records(RuleKey::FlowViolations).len(), 2);
        assert!(!r.is_clean());
    }

    #[test]
    fn json_shape() {
        let r = sample().degraded("no output");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["total_count"], 3);
        assert_eq!(v["solver_status"], "degraded");
        assert_eq!(v["degraded_reason"], "no output");
        assert_eq!(v["threats"]["FindShadowIT"][0]["system"], "s1");
        assert_eq!(v["threats"]["FindEOL"], serde_json::json!([]));
        assert_eq!(v["merged"]["FindFlowViolations"][0]["data"], serde_json::json!(["d1", "d2"]));
        assert_eq!(
            v["merged"]["FindFlowViolations"][0]["member_indices"],
            serde_json::json!([0, 1])
        );
    }

    #[test]
    fn complete_report_omits_reason() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["solver_status"], "complete");
        assert!(v.get("degraded_reason").is_none());
    }

    #[test]
    fn text_lists_fired_rules_only() {
        let text = sample().render_text();
        assert!(text.starts_with("archcheck: 3 violation(s) in 2 group(s) [solver complete] spec 0123456789ab"));
        assert!(text.contains("FindFlowViolations (1)"));
        assert!(text.contains("connection 'c1' [data: d1, d2]"));
        assert!(text.contains("FindShadowIT (1)"));
        assert!(!text.contains("FindEOL"));
        assert!(!text.contains("warnings:"));
    }

    #[test]
    fn text_shows_warnings() {
        let r = sample().with_warnings(vec![ConsistencyWarning::UnknownRule {
            field: "FindOld".to_string(),
        }]);
        assert!(r.render_text().contains("undeclared rule field 'FindOld'"));
    }

    #[test]
    fn text_layout_is_line_per_item() {
        let text = sample().degraded("engine produced no output at replay").render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "  engine output unavailable: engine produced no output at replay");
        assert_eq!(lines[2], "");
        assert!(lines[3].ends_with(" (1)"));
        assert!(lines[4].starts_with("  "));
        assert!(lines[5].starts_with("  - "));
        assert!(text.ends_with('\n'));
    }
}
