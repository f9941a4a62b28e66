mod commands;
mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::ArchcheckConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Security-policy checks for network architecture graphs.
#[derive(Parser)]
#[command(
    name = "archcheck",
    version,
    about = "Security-policy checks for network architecture graphs"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file (default: $ARCHCHECK_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph to the engine's specification language
    Compile {
        /// Path to the graph JSON file
        graph: PathBuf,
        /// Write the specification here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Decode a recorded engine result
    Decode {
        /// Path to the engine's XML output
        file: PathBuf,
        /// Graph the result belongs to; produces a full report
        #[arg(long)]
        graph: Option<PathBuf>,
    },

    /// Evaluate only the in-process rules
    Fast {
        /// Path to the graph JSON file
        graph: PathBuf,
    },

    /// Run the full analysis: engine plus in-process rules
    Check {
        /// Path to the graph JSON file
        graph: PathBuf,
        /// Use a recorded engine result instead of running the engine
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Engine timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Start the HTTP analysis service
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let config = match ArchcheckConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Compile { graph, out } => {
            commands::compile::cmd_compile(&graph, out.as_deref(), cli.output, cli.quiet);
        }
        Commands::Decode { file, graph } => {
            commands::decode::cmd_decode(&file, graph.as_deref(), cli.output, cli.quiet);
        }
        Commands::Fast { graph } => {
            commands::check::cmd_fast(&graph, cli.output, cli.quiet);
        }
        Commands::Check {
            graph,
            replay,
            timeout,
        } => {
            let mut engine = config.engine;
            if let Some(secs) = timeout {
                engine.timeout_secs = secs;
            }
            commands::check::cmd_check(&graph, replay.as_deref(), engine, cli.output, cli.quiet);
        }
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(p) = port {
                config.server.port = p;
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(&format!("failed to create tokio runtime: {}", e), cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise `info`, or `warn` when quiet.
fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
