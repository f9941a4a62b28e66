//! Integration tests for the analysis pipeline.
//!
//! These tests load graph fixtures, replay recorded engine output from
//! `conformance/engine/`, and check the resulting reports.

use std::path::{Path, PathBuf};

use archcheck_analyze::{
    run_analysis, ConsistencyWarning, SolverStatus, Subject, ViolationReport,
};
use archcheck_model::{EntityKind, RuleKey};
use archcheck_solver::ReplaySolver;

/// Locate the workspace root.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn graph(name: &str) -> serde_json::Value {
    let path = workspace_root().join("conformance/graphs").join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("bad JSON in {}: {}", name, e))
}

fn engine_output(name: &str) -> String {
    let path = workspace_root().join("conformance/engine").join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

async fn replay(graph_name: &str, xml: &str) -> ViolationReport {
    let backend = ReplaySolver::new(engine_output(xml));
    run_analysis(&graph(graph_name), &backend)
        .await
        .unwrap_or_else(|e| panic!("analysis failed for {}: {}", graph_name, e))
}

fn subjects(report: &ViolationReport, rule: RuleKey) -> Vec<Subject> {
    report
        .records(rule)
        .iter()
        .map(|r| r.subject.clone())
        .collect()
}

fn attack_conn() -> Subject {
    Subject::Connection("Attack_Conn".to_string())
}

fn admin_server() -> Subject {
    Subject::System("Admin_Server".to_string())
}

// ──────────────────────────────────────────────
// Admin access scenario
// ──────────────────────────────────────────────

#[tokio::test]
async fn admin_access_from_mobile_terminal() {
    let report = replay("admin_access.json", "admin_access.xml").await;

    assert_eq!(report.solver_status, SolverStatus::Complete);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    assert_eq!(subjects(&report, RuleKey::AdminAccessViolation), vec![attack_conn()]);
    assert_eq!(subjects(&report, RuleKey::BypassViolations), vec![attack_conn()]);
    assert_eq!(subjects(&report, RuleKey::UnmanagedMobileAccess), vec![attack_conn()]);

    let content = report.records(RuleKey::ContentControlFailures);
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].subject, attack_conn());
    assert_eq!(content[0].data.as_deref(), Some("Sensitive_Data"));

    assert!(report.records(RuleKey::StorageViolations).is_empty());
    assert!(report.records(RuleKey::UnencryptedChannels).is_empty());
}

#[tokio::test]
async fn admin_access_fast_path_findings() {
    let report = replay("admin_access.json", "admin_access.xml").await;

    assert_eq!(subjects(&report, RuleKey::AuditFailure), vec![admin_server()]);
    assert_eq!(subjects(&report, RuleKey::WeakSession), vec![admin_server()]);
    assert!(report.records(RuleKey::ShadowIt).is_empty());
    assert!(report.records(RuleKey::UnpatchedExposure).is_empty());

    assert_eq!(report.total_count, 6);
    assert_eq!(report.merged_count, 6);
}

#[tokio::test]
async fn report_json_carries_every_rule_key() {
    let report = replay("admin_access.json", "admin_access.xml").await;
    let json = serde_json::to_value(&report).unwrap();

    let threats = json["threats"].as_object().expect("threats object");
    assert_eq!(threats.len(), RuleKey::ALL.len());
    for rule in RuleKey::ALL {
        assert!(threats.contains_key(rule.key()), "missing {}", rule);
    }
    assert_eq!(json["threats"]["FindAdminAccessViolation"][0]["connection"], "Attack_Conn");
    assert_eq!(json["solver_status"], "complete");
    assert_eq!(json["spec_digest"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn identical_graphs_share_a_digest() {
    let a = replay("admin_access.json", "clean.xml").await;
    let b = replay("admin_access.json", "admin_access.xml").await;
    assert_eq!(a.spec_digest, b.spec_digest);
}

// ──────────────────────────────────────────────
// Clean and degraded engine results
// ──────────────────────────────────────────────

#[tokio::test]
async fn clean_output_leaves_fast_path_only() {
    let report = replay("admin_access.json", "clean.xml").await;
    assert_eq!(report.solver_status, SolverStatus::Complete);
    assert!(report.records(RuleKey::AdminAccessViolation).is_empty());
    assert_eq!(report.total_count, 2);
}

#[tokio::test]
async fn truncated_output_degrades() {
    let report = replay("admin_access.json", "truncated.xml").await;
    assert_eq!(report.solver_status, SolverStatus::Degraded);
    assert!(report.degraded_reason.is_some());
    assert!(report.records(RuleKey::AdminAccessViolation).is_empty());
    assert_eq!(subjects(&report, RuleKey::WeakSession), vec![admin_server()]);
}

#[tokio::test]
async fn missing_output_degrades() {
    let backend = ReplaySolver::without_output();
    let report = run_analysis(&graph("admin_access.json"), &backend)
        .await
        .unwrap();
    assert_eq!(report.solver_status, SolverStatus::Degraded);
    assert!(report
        .degraded_reason
        .as_deref()
        .is_some_and(|r| r.contains("no output")));
    assert_eq!(report.total_count, 2);
}

#[tokio::test]
async fn output_without_the_result_shape_degrades() {
    let backend =
        ReplaySolver::new("<alloy><instance><sig label=\"this/Other\"/></instance></alloy>");
    let report = run_analysis(&graph("admin_access.json"), &backend)
        .await
        .unwrap();

    assert_eq!(report.solver_status, SolverStatus::Degraded);
    assert!(report
        .degraded_reason
        .as_deref()
        .is_some_and(|r| r.contains("FindAdminAccessViolation")));
    assert_eq!(report.total_count, 2);
}

#[tokio::test]
async fn drifted_output_is_reported_as_warnings() {
    let report = replay("admin_access.json", "drifted.xml").await;

    assert_eq!(report.solver_status, SolverStatus::Complete);
    assert!(report.warnings.contains(&ConsistencyWarning::UnknownRule {
        field: "FindLegacyViolations".to_string()
    }));
    assert!(report
        .warnings
        .contains(&ConsistencyWarning::FastPathRuleFromSolver { rule: RuleKey::Eol }));
    assert!(report.warnings.contains(&ConsistencyWarning::UnknownAtom {
        rule: RuleKey::LocationViolations,
        entity: EntityKind::System,
        atom: "ghost".to_string(),
    }));

    // The short tuple is dropped, the unknown id is kept verbatim.
    assert_eq!(
        subjects(&report, RuleKey::LocationViolations),
        vec![Subject::System("ghost".to_string())]
    );
    // FindEOL from the engine does not leak into the fast-path rule.
    assert!(report.records(RuleKey::Eol).is_empty());
}

// ──────────────────────────────────────────────
// Fast-path scenarios
// ──────────────────────────────────────────────

#[tokio::test]
async fn unpatched_frontend_in_internet_zone() {
    let report = replay("unpatched_exposure.json", "clean.xml").await;
    assert_eq!(
        subjects(&report, RuleKey::UnpatchedExposure),
        vec![Subject::System("web-frontend".to_string())]
    );
}

#[tokio::test]
async fn patched_frontend_is_not_exposed() {
    let mut g = graph("unpatched_exposure.json");
    g["systems"][0]["patchStatus"] = serde_json::json!("UpToDate");
    let backend = ReplaySolver::new(engine_output("clean.xml"));
    let report = run_analysis(&g, &backend).await.unwrap();
    assert!(report.records(RuleKey::UnpatchedExposure).is_empty());
}

#[tokio::test]
async fn empty_graph_is_clean() {
    let report = replay("empty.json", "clean.xml").await;
    assert!(report.is_clean());
    assert_eq!(report.threats.len(), RuleKey::ALL.len());
}
