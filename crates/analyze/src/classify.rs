//! Turning decoded relation tuples into typed violation records.

use std::collections::BTreeMap;
use std::fmt;

use archcheck_model::{normalize_id, Arity, Engine, EntityKind, IdMaps, RuleKey};
use serde::Serialize;

use crate::decode::RelationTable;

/// The entity a violation is reported against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    System(String),
    Connection(String),
}

impl Subject {
    pub fn id(&self) -> &str {
        match self {
            Subject::System(id) | Subject::Connection(id) => id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Subject::System(_) => EntityKind::System,
            Subject::Connection(_) => EntityKind::Connection,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::System(id) => write!(f, "system '{}'", id),
            Subject::Connection(id) => write!(f, "connection '{}'", id),
        }
    }
}

/// One rule hit. Serializes as `{"system": id, "remediation": ...}` or
/// `{"connection": id, "data": id, "remediation": ...}`; the rule key is
/// carried by the enclosing map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    #[serde(skip)]
    pub rule: RuleKey,
    #[serde(flatten)]
    pub subject: Subject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub remediation: String,
}

impl ViolationRecord {
    /// A record carrying the catalog remediation for `rule`.
    pub fn new(rule: RuleKey, subject: Subject, data: Option<String>) -> Self {
        ViolationRecord {
            rule,
            subject,
            data,
            remediation: rule.remediation().to_string(),
        }
    }
}

/// Records per rule, in catalog order.
pub type ThreatMap = BTreeMap<RuleKey, Vec<ViolationRecord>>;

/// Engine output that disagrees with the rule catalog or the input graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    /// A `Find*` field that no catalog rule declares.
    UnknownRule { field: String },
    /// A rule evaluated in-process showed up in engine output.
    FastPathRuleFromSolver { rule: RuleKey },
    /// A tuple referenced an id absent from the graph.
    UnknownAtom {
        rule: RuleKey,
        entity: EntityKind,
        atom: String,
    },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyWarning::UnknownRule { field } => {
                write!(f, "engine reported undeclared rule field '{}'", field)
            }
            ConsistencyWarning::FastPathRuleFromSolver { rule } => {
                write!(f, "engine reported '{}', which is evaluated in-process", rule)
            }
            ConsistencyWarning::UnknownAtom { rule, entity, atom } => {
                write!(f, "{}: {} '{}' is not in the input graph", rule, entity, atom)
            }
        }
    }
}

/// Solver-side records plus anything that looked inconsistent.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub threats: ThreatMap,
    pub warnings: Vec<ConsistencyWarning>,
}

/// Build violation records from every catalogued solver field.
///
/// The first position of every tuple is the result-shape anchor. Ids are
/// mapped back to the editor's original ids through `ids`.
pub fn classify(table: &RelationTable, ids: &IdMaps) -> Classification {
    let mut out = Classification {
        threats: RuleKey::solver_rules().map(|r| (r, Vec::new())).collect(),
        warnings: Vec::new(),
    };

    for label in table.labels() {
        match RuleKey::from_key(label) {
            Some(rule) if rule.engine() == Engine::FastPath => {
                out.warnings
                    .push(ConsistencyWarning::FastPathRuleFromSolver { rule });
            }
            Some(_) => {}
            None if label.starts_with("Find") => {
                out.warnings.push(ConsistencyWarning::UnknownRule {
                    field: label.to_string(),
                });
            }
            None => {}
        }
    }

    for rule in RuleKey::solver_rules() {
        let arity = rule.arity();
        let mut records = Vec::new();
        for tuple in table.get(rule.key()) {
            if tuple.len() < arity.tuple_len() {
                tracing::debug!(rule = %rule, len = tuple.len(), "short tuple skipped");
                continue;
            }
            let subject_kind = arity.subject();
            let id = original_id(ids, subject_kind, &tuple[1], rule, &mut out.warnings);
            let subject = match subject_kind {
                EntityKind::Connection => Subject::Connection(id),
                _ => Subject::System(id),
            };
            let data = match arity {
                Arity::SystemData | Arity::ConnectionData => Some(original_id(
                    ids,
                    EntityKind::Data,
                    &tuple[2],
                    rule,
                    &mut out.warnings,
                )),
                Arity::System | Arity::Connection => None,
            };
            records.push(ViolationRecord::new(rule, subject, data));
        }
        if !records.is_empty() {
            tracing::debug!(rule = %rule, count = records.len(), "solver violations");
        }
        out.threats.insert(rule, records);
    }

    for w in &out.warnings {
        tracing::warn!("{}", w);
    }
    out
}

fn original_id(
    ids: &IdMaps,
    kind: EntityKind,
    cleaned: &str,
    rule: RuleKey,
    warnings: &mut Vec<ConsistencyWarning>,
) -> String {
    match ids.for_kind(kind).raw_for(&normalize_id(cleaned)) {
        Some(raw) => raw.to_string(),
        None => {
            warnings.push(ConsistencyWarning::UnknownAtom {
                rule,
                entity: kind,
                atom: cleaned.to_string(),
            });
            cleaned.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use serde_json::json;

    fn graph() -> archcheck_model::Graph {
        archcheck_model::from_graph_json(&json!({
            "locations": [{ "id": "zone-a" }],
            "data": [{ "id": "d.1", "grade": "Classified" }],
            "systems": [
                { "id": "web-01", "location": "zone-a" },
                { "id": "db", "location": "zone-a" }
            ],
            "connections": [{ "id": "c/1", "from": "web-01", "to": "db" }]
        }))
        .unwrap()
    }

    fn field(label: &str, tuples: &[&[&str]]) -> String {
        let mut s = format!("<field label=\"{}\">", label);
        for t in tuples {
            s.push_str("<tuple>");
            for a in *t {
                s.push_str(&format!("<atom label=\"{}\"/>", a));
            }
            s.push_str("</tuple>");
        }
        s.push_str("</field>");
        s
    }

    fn table(fields: &[String]) -> RelationTable {
        decode(&format!("<alloy><instance>{}</instance></alloy>", fields.concat())).unwrap()
    }

    #[test]
    fn ids_map_back_to_originals() {
        let t = table(&[
            field(
                "FindStorageViolations",
                &[&["AnalysisResult$0", "System_web_01$0", "Data_d_1$0"]],
            ),
            field("FindUnencryptedChannels", &[&["AnalysisResult$0", "Connection_c_1$0"]]),
        ]);
        let c = classify(&t, &graph().ids);
        assert!(c.warnings.is_empty(), "{:?}", c.warnings);

        let storage = &c.threats[&RuleKey::StorageViolations];
        assert_eq!(storage.len(), 1);
        assert_eq!(storage[0].subject, Subject::System("web-01".to_string()));
        assert_eq!(storage[0].data.as_deref(), Some("d.1"));
        assert_eq!(storage[0].remediation, RuleKey::StorageViolations.remediation());

        let chans = &c.threats[&RuleKey::UnencryptedChannels];
        assert_eq!(chans[0].subject, Subject::Connection("c/1".to_string()));
        assert_eq!(chans[0].data, None);
    }

    #[test]
    fn every_solver_rule_is_present() {
        let c = classify(&RelationTable::default(), &graph().ids);
        assert_eq!(c.threats.len(), RuleKey::solver_rules().count());
        assert!(c.threats.values().all(Vec::is_empty));
    }

    #[test]
    fn short_tuples_are_skipped() {
        let t = table(&[field(
            "FindFlowViolations",
            &[
                &["AnalysisResult$0", "Connection_c_1$0"],
                &["AnalysisResult$0", "Connection_c_1$0", "Data_d_1$0"],
            ],
        )]);
        let c = classify(&t, &graph().ids);
        assert_eq!(c.threats[&RuleKey::FlowViolations].len(), 1);
    }

    #[test]
    fn drift_is_reported_not_fatal() {
        let t = table(&[
            field("FindLegacyViolations", &[&["AnalysisResult$0", "System_db$0"]]),
            field("FindShadowIT", &[&["AnalysisResult$0", "System_db$0"]]),
            field("grade", &[&["System_db$0", "Open$0"]]),
            field("FindLocationViolations", &[&["AnalysisResult$0", "System_ghost$0"]]),
        ]);
        let c = classify(&t, &graph().ids);
        assert_eq!(
            c.warnings,
            vec![
                ConsistencyWarning::UnknownRule {
                    field: "FindLegacyViolations".to_string()
                },
                ConsistencyWarning::FastPathRuleFromSolver {
                    rule: RuleKey::ShadowIt
                },
                ConsistencyWarning::UnknownAtom {
                    rule: RuleKey::LocationViolations,
                    entity: EntityKind::System,
                    atom: "ghost".to_string()
                },
            ]
        );
        assert!(!c.threats.contains_key(&RuleKey::ShadowIt));
        assert_eq!(
            c.threats[&RuleKey::LocationViolations][0].subject,
            Subject::System("ghost".to_string())
        );
    }

    #[test]
    fn record_serialization_shape() {
        let r = ViolationRecord::new(
            RuleKey::FlowViolations,
            Subject::Connection("c1".to_string()),
            Some("d".to_string()),
        );
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["connection"], "c1");
        assert_eq!(v["data"], "d");
        assert!(v.get("rule").is_none());

        let r = ViolationRecord::new(RuleKey::ShadowIt, Subject::System("s".to_string()), None);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["system"], "s");
        assert!(v.get("data").is_none());
    }

    #[test]
    fn warning_serialization_is_tagged() {
        let w = ConsistencyWarning::FastPathRuleFromSolver { rule: RuleKey::Eol };
        assert_eq!(
            serde_json::to_value(&w).unwrap(),
            json!({ "kind": "fast_path_rule_from_solver", "rule": "FindEOL" })
        );
    }
}
