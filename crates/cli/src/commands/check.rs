use std::path::Path;
use std::process;
use std::sync::Arc;

use archcheck_analyze::{analyze_graph, fast_report};
use archcheck_solver::{EngineConfig, ProcessSolver, ReplaySolver, SolverBackend};

use crate::commands::{load_graph, print_report, read_file};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_fast(graph_path: &Path, output: OutputFormat, quiet: bool) {
    let graph = load_graph(graph_path, output, quiet);
    print_report(&fast_report(&graph), output, quiet);
}

pub(crate) fn cmd_check(
    graph_path: &Path,
    replay: Option<&Path>,
    engine: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let graph = load_graph(graph_path, output, quiet);

    let backend: Arc<dyn SolverBackend> = match replay {
        Some(path) => Arc::new(ReplaySolver::new(read_file(path, output, quiet))),
        None => Arc::new(ProcessSolver::new(engine)),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to create tokio runtime: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match rt.block_on(analyze_graph(graph, backend.as_ref())) {
        Ok(report) => print_report(&report, output, quiet),
        Err(e) => {
            let msg = format!("analysis failed ({}): {}", e.kind().as_str(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
