//! One analysis request, end to end.
//!
//! normalize -> compile -> (engine run || fast path) -> decode -> classify
//! -> merge -> report. Missing or malformed engine output degrades the
//! report to fast-path results; every other engine failure is an error.

use std::sync::Arc;

use archcheck_codegen::{compile, CodegenError};
use archcheck_model::{from_graph_json, Graph, ModelError, RuleKey};
use archcheck_solver::{EngineError, SolverBackend};
use serde::Serialize;
use serde_json::Value;

use crate::classify::{classify, ThreatMap};
use crate::decode::{decode, RelationTable};
use crate::fastpath;
use crate::report::ViolationReport;

/// Coarse error category, as exposed to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input graph is inconsistent.
    Structural,
    /// The engine could not be run to completion.
    EngineInvocation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::EngineInvocation => "engine_invocation",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("fast-path evaluation failed: {0}")]
    FastPath(#[from] tokio::task::JoinError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Model(_) | PipelineError::Codegen(_) => ErrorKind::Structural,
            PipelineError::Engine(_) => ErrorKind::EngineInvocation,
            PipelineError::FastPath(_) => ErrorKind::Internal,
        }
    }
}

/// Analyze an editor graph payload.
pub async fn run_analysis(
    graph_json: &Value,
    backend: &dyn SolverBackend,
) -> Result<ViolationReport, PipelineError> {
    let graph = from_graph_json(graph_json)?;
    analyze_graph(graph, backend).await
}

/// Analyze an already-normalized graph.
pub async fn analyze_graph(
    graph: Graph,
    backend: &dyn SolverBackend,
) -> Result<ViolationReport, PipelineError> {
    tracing::info!(
        locations = graph.locations.len(),
        data = graph.data.len(),
        systems = graph.systems.len(),
        connections = graph.connections.len(),
        "graph normalized"
    );

    let spec = compile(&graph)?;
    tracing::info!(digest = spec.short_digest(), bytes = spec.as_str().len(), "specification compiled");

    let graph = Arc::new(graph);
    let fast_graph = Arc::clone(&graph);
    let fast_task = tokio::task::spawn_blocking(move || fastpath::evaluate(&fast_graph));

    let (fast, solved) = tokio::join!(fast_task, backend.solve(&spec));
    let fast = fast?;

    let report = match solved {
        Ok(output) => interpret(&output.raw, &graph, &fast, spec.digest()),
        Err(e) if e.is_degradable() => {
            tracing::warn!(engine = backend.name(), error = %e, "engine output unavailable; reporting fast-path results only");
            ViolationReport::build(&ThreatMap::new(), &fast, spec.digest()).degraded(e.to_string())
        }
        Err(e) => {
            tracing::error!(engine = backend.name(), error = %e, "engine invocation failed");
            return Err(e.into());
        }
    };

    tracing::info!(
        violations = report.total_count,
        groups = report.merged_count,
        status = report.solver_status.as_str(),
        "analysis finished"
    );
    Ok(report)
}

/// Combine raw engine output for `graph` with fast-path results.
///
/// Malformed output, or output that does not declare every result field
/// of the compiled shape, yields a degraded report rather than an error.
pub fn interpret(raw: &str, graph: &Graph, fast: &ThreatMap, spec_digest: &str) -> ViolationReport {
    let table = match decode(raw) {
        Ok(table) => table,
        Err(e) => {
            tracing::warn!(offset = e.offset, error = %e, "engine output could not be decoded");
            return ViolationReport::build(&ThreatMap::new(), fast, spec_digest)
                .degraded(e.to_string());
        }
    };

    let missing = missing_result_fields(&table);
    if !missing.is_empty() {
        tracing::warn!(missing = missing.len(), "engine output does not match the result shape");
        let reason = format!("engine output lacks result fields: {}", missing.join(", "));
        return ViolationReport::build(&ThreatMap::new(), fast, spec_digest).degraded(reason);
    }

    let classified = classify(&table, &graph.ids);
    ViolationReport::build(&classified.threats, fast, spec_digest).with_warnings(classified.warnings)
}

/// Solver rule fields the engine output never declared. An instance of
/// the compiled specification declares all of them, even when empty.
fn missing_result_fields(table: &RelationTable) -> Vec<&'static str> {
    RuleKey::solver_rules()
        .map(RuleKey::key)
        .filter(|key| !table.contains(key))
        .collect()
}

/// Fast-path rules only; the engine is not consulted.
pub fn fast_report(graph: &Graph) -> ViolationReport {
    let fast = fastpath::evaluate(graph);
    ViolationReport::build(&ThreatMap::new(), &fast, "").skipped()
}
