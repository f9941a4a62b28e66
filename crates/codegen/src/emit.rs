//! Specification text emission.

use std::collections::BTreeSet;

use archcheck_model::{atom_label, AtomEnum, EntityKind, Graph, RuleKey, SafeId};

use crate::{CodegenError, BASE_MODEL, MODULE_NAME};

/// Render a set-valued attribute: `none` when empty, otherwise the atoms
/// joined with ` + ` in first-appearance order with duplicates removed.
pub fn join_set(kind: EntityKind, ids: &[SafeId]) -> String {
    let mut seen = BTreeSet::new();
    let atoms: Vec<String> = ids
        .iter()
        .filter(|id| seen.insert(*id))
        .map(|id| atom_label(kind, id))
        .collect();
    if atoms.is_empty() {
        "none".to_string()
    } else {
        atoms.join(" + ")
    }
}

/// Run scope: the largest per-kind entity count, at least 3.
pub fn scope(graph: &Graph) -> usize {
    EntityKind::ALL
        .iter()
        .map(|k| graph.count(*k))
        .max()
        .unwrap_or(0)
        .max(3)
}

fn flag(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Declared safe ids per kind, checked before any reference is emitted.
struct Declared {
    locations: BTreeSet<SafeId>,
    data: BTreeSet<SafeId>,
    systems: BTreeSet<SafeId>,
}

impl Declared {
    fn of(graph: &Graph) -> Self {
        Declared {
            locations: graph.locations.iter().map(|l| l.id.safe.clone()).collect(),
            data: graph.data.iter().map(|d| d.id.safe.clone()).collect(),
            systems: graph.systems.iter().map(|s| s.id.safe.clone()).collect(),
        }
    }

    fn check(
        set: &BTreeSet<SafeId>,
        target: &SafeId,
        owner: &str,
        field: &str,
    ) -> Result<(), CodegenError> {
        if set.contains(target) {
            Ok(())
        } else {
            Err(CodegenError::Structural(format!(
                "{}.{} references undeclared '{}'",
                owner, field, target
            )))
        }
    }
}

pub(crate) fn emit(graph: &Graph) -> Result<String, CodegenError> {
    let declared = Declared::of(graph);
    let mut out = String::with_capacity(BASE_MODEL.len() + 512 * graph.systems.len());

    out.push_str(&format!("module {}\n\n", MODULE_NAME));
    out.push_str(BASE_MODEL);
    if !BASE_MODEL.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("\n// ---- instance ----\n\n");

    for loc in &graph.locations {
        let atom = atom_label(EntityKind::Location, &loc.id.safe);
        out.push_str(&format!("one sig {} extends Location {{}}\n", atom));
        out.push_str("fact {\n");
        out.push_str(&format!("    {}.grade = {}\n", atom, loc.grade));
        out.push_str(&format!("    {}.type = {}\n", atom, loc.zone_type));
        out.push_str("}\n\n");
    }

    for d in &graph.data {
        let atom = atom_label(EntityKind::Data, &d.id.safe);
        if d.inferred {
            out.push_str(&format!("// inferred from reference: {}\n", d.id.safe));
        }
        out.push_str(&format!("one sig {} extends Data {{}}\n", atom));
        out.push_str("fact {\n");
        out.push_str(&format!("    {}.grade = {}\n", atom, d.grade));
        out.push_str(&format!("    {}.fileType = {}\n", atom, d.file_type));
        out.push_str("}\n\n");
    }

    for s in &graph.systems {
        let atom = atom_label(EntityKind::System, &s.id.safe);
        Declared::check(&declared.locations, &s.location, &atom, "loc")?;
        for stored in &s.stores {
            Declared::check(&declared.data, stored, &atom, "stores")?;
        }

        out.push_str(&format!("one sig {} extends System {{}}\n", atom));
        out.push_str("fact {\n");
        let mut line = |field: &str, value: &str| {
            out.push_str(&format!("    {}.{} = {}\n", atom, field, value));
        };
        line("grade", s.grade.atom());
        line("loc", &atom_label(EntityKind::Location, &s.location));
        line("type", s.system_type.atom());
        line("authType", s.auth_type.atom());
        line("isCDS", flag(s.is_cds));
        line("isRegistered", flag(s.is_registered));
        line("isStorageEncrypted", flag(s.is_storage_encrypted));
        line("isManagement", flag(s.is_management));
        line("isolation", s.isolation.atom());
        line("hasMDM", flag(s.has_mdm));
        line("patchStatus", s.patch_status.atom());
        line("lifeCycle", s.life_cycle.atom());
        line("hasAuditLogging", flag(s.has_audit_logging));
        line("hasSecureClock", flag(s.has_secure_clock));
        line("sessionPolicy", s.session_policy.atom());
        line("stores", &join_set(EntityKind::Data, &s.stores));
        out.push_str("}\n\n");
    }

    for c in &graph.connections {
        let atom = atom_label(EntityKind::Connection, &c.id.safe);
        Declared::check(&declared.systems, &c.from, &atom, "from")?;
        Declared::check(&declared.systems, &c.to, &atom, "to")?;
        for carried in &c.carries {
            Declared::check(&declared.data, carried, &atom, "carries")?;
        }

        out.push_str(&format!("one sig {} extends Connection {{}}\n", atom));
        out.push_str("fact {\n");
        let mut line = |field: &str, value: &str| {
            out.push_str(&format!("    {}.{} = {}\n", atom, field, value));
        };
        line("from", &atom_label(EntityKind::System, &c.from));
        line("to", &atom_label(EntityKind::System, &c.to));
        line("carries", &join_set(EntityKind::Data, &c.carries));
        line("protocol", c.protocol.atom());
        line("isEncrypted", flag(c.is_encrypted));
        line("hasCDR", flag(c.has_cdr));
        line("hasDLP", flag(c.has_dlp));
        line("hasAntiVirus", flag(c.has_anti_virus));
        out.push_str("}\n\n");
    }

    emit_result_shape(&mut out);
    out.push_str(&format!("run {{}} for {}\n", scope(graph)));
    Ok(out)
}

fn emit_result_shape(out: &mut String) {
    let rules: Vec<RuleKey> = RuleKey::solver_rules().collect();

    out.push_str("one sig AnalysisResult {\n");
    for (i, rule) in rules.iter().enumerate() {
        let sep = if i + 1 < rules.len() { "," } else { "" };
        out.push_str(&format!(
            "    {}: set {}{}\n",
            rule.key(),
            rule.arity().type_expr(),
            sep
        ));
    }
    out.push_str("}\n\n");

    out.push_str("fact DefineAnalysisResult {\n");
    for rule in &rules {
        if let Some(f) = rule.solver_fn() {
            out.push_str(&format!("    AnalysisResult.{} = {}\n", rule.key(), f));
        }
    }
    out.push_str("}\n\n");
}
