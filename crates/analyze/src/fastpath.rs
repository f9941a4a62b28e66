//! Rules evaluated directly against the graph, without an engine round-trip.
//!
//! Every rule here looks at a single system and its zone.

use archcheck_model::{Graph, LifeCycle, PatchStatus, RuleKey, SessionPolicy, System};

use crate::classify::{Subject, ThreatMap, ViolationRecord};

/// Evaluate every fast-path rule. The map holds every fast-path key, with
/// an empty list for rules that did not fire.
pub fn evaluate(graph: &Graph) -> ThreatMap {
    let mut threats: ThreatMap = RuleKey::fast_path_rules()
        .map(|r| (r, Vec::new()))
        .collect();

    for system in &graph.systems {
        let externally_exposed = graph
            .zone_of(system)
            .is_some_and(|zone| zone.zone_type.is_external());

        for rule in RuleKey::fast_path_rules() {
            if fires(rule, system, externally_exposed) {
                tracing::debug!(rule = %rule, system = %system.id.raw, "fast-path violation");
                if let Some(records) = threats.get_mut(&rule) {
                    records.push(ViolationRecord::new(
                        rule,
                        Subject::System(system.id.raw.clone()),
                        None,
                    ));
                }
            }
        }
    }

    let total: usize = threats.values().map(Vec::len).sum();
    tracing::info!(violations = total, "fast-path rules evaluated");
    threats
}

fn fires(rule: RuleKey, s: &System, externally_exposed: bool) -> bool {
    let sensitive = s.grade.is_critical();
    match rule {
        RuleKey::UnpatchedExposure => s.patch_status == PatchStatus::Vulnerable && externally_exposed,
        RuleKey::Eol => sensitive && s.life_cycle == LifeCycle::Eol,
        RuleKey::AuditFailure => sensitive && !s.has_audit_logging,
        RuleKey::TimeSyncFailure => s.has_audit_logging && !s.has_secure_clock,
        RuleKey::WeakSession => sensitive && s.session_policy != SessionPolicy::Strict,
        RuleKey::ShadowIt => !s.is_registered,
        _ => false,
    }
}
