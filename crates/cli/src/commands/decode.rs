use std::path::Path;
use std::process;

use archcheck_analyze::{decode, fastpath, interpret};

use crate::commands::{load_graph, print_json, print_report, read_file};
use crate::{report_error, OutputFormat};

/// Without a graph, print the decoded relation table. With one, build the
/// report the server would have returned for that engine result.
pub(crate) fn cmd_decode(file: &Path, graph_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let raw = read_file(file, output, quiet);

    let Some(graph_path) = graph_path else {
        let table = match decode(&raw) {
            Ok(t) => t,
            Err(e) => {
                report_error(&format!("{}: {}", file.display(), e), output, quiet);
                process::exit(1);
            }
        };
        if quiet {
            return;
        }
        match output {
            OutputFormat::Json => print_json(&table),
            OutputFormat::Text => {
                for label in table.labels() {
                    let tuples = table.get(label);
                    println!("{} ({})", label, tuples.len());
                    for t in tuples {
                        println!("  ({})", t.join(", "));
                    }
                }
            }
        }
        return;
    };

    let graph = load_graph(graph_path, output, quiet);
    let spec = match archcheck_codegen::compile(&graph) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("compile error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let fast = fastpath::evaluate(&graph);
    let report = interpret(&raw, &graph, &fast, spec.digest());
    print_report(&report, output, quiet);
}
