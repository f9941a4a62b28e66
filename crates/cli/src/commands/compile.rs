use std::path::Path;
use std::process;

use crate::commands::{load_graph, print_json};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_compile(graph_path: &Path, out: Option<&Path>, output: OutputFormat, quiet: bool) {
    let graph = load_graph(graph_path, output, quiet);
    let spec = match archcheck_codegen::compile(&graph) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("compile error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, spec.as_str()) {
                let msg = format!("error writing '{}': {}", path.display(), e);
                report_error(&msg, output, quiet);
                process::exit(1);
            }
            if !quiet {
                match output {
                    OutputFormat::Json => print_json(&serde_json::json!({
                        "path": path.display().to_string(),
                        "digest": spec.digest(),
                        "bytes": spec.as_str().len(),
                    })),
                    OutputFormat::Text => {
                        println!("wrote {} (sha256 {})", path.display(), spec.short_digest());
                    }
                }
            }
        }
        None => match output {
            OutputFormat::Json => print_json(&serde_json::json!({
                "digest": spec.digest(),
                "spec": spec.as_str(),
            })),
            OutputFormat::Text => print!("{}", spec.as_str()),
        },
    }
}
