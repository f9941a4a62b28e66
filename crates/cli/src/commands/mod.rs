pub(crate) mod check;
pub(crate) mod compile;
pub(crate) mod decode;

use std::path::Path;
use std::process;

use archcheck_analyze::ViolationReport;
use archcheck_model::Graph;
use serde::Serialize;

use crate::{report_error, OutputFormat};

/// Read and normalize a graph file, exiting on failure.
pub(crate) fn load_graph(path: &Path, output: OutputFormat, quiet: bool) -> Graph {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match archcheck_model::from_graph_str(&text) {
        Ok(g) => g,
        Err(e) => {
            let msg = format!("invalid graph '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn read_file(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}

pub(crate) fn print_report(report: &ViolationReport, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(report),
        OutputFormat::Text => print!("{}", report.render_text()),
    }
}
