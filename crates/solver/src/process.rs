//! Engine invocation as an external process.
//!
//! Every run gets a fresh work directory holding its spec and result files,
//! so concurrent requests never read each other's results. The engine
//! itself runs in the launch directory. A semaphore bounds the number of
//! live engine processes, and children are killed when their request is
//! dropped.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use archcheck_codegen::SpecText;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{OnceCell, Semaphore};
use tokio::time::timeout;

use crate::config::{substitute, CommandSpec, EngineConfig};
use crate::error::EngineError;
use crate::traits::{SolverBackend, SolverOutput};

/// Longest stderr excerpt carried in an error.
const STDERR_LIMIT: usize = 2000;

/// Runs the configured engine command per request.
pub struct ProcessSolver {
    config: EngineConfig,
    permits: Arc<Semaphore>,
    prepared: OnceCell<()>,
}

impl ProcessSolver {
    pub fn new(config: EngineConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        ProcessSolver {
            config,
            permits,
            prepared: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the prepare command if configured and not yet run. A failed
    /// prepare is retried by the next request.
    async fn prepare(&self) -> Result<(), EngineError> {
        let Some(prepare) = &self.config.prepare else {
            return Ok(());
        };
        self.prepared
            .get_or_try_init(|| async {
                tracing::info!(program = %prepare.program, "running engine prepare step");
                let output = run_to_completion(prepare, &[], self.config.timeout_secs)
                    .await
                    .map_err(|e| EngineError::Prepare(e.to_string()))?;
                if !output.status.success() {
                    return Err(EngineError::Prepare(format!(
                        "exit status {}: {}",
                        output.status.code().unwrap_or(-1),
                        excerpt(&output.stderr)
                    )));
                }
                Ok(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl SolverBackend for ProcessSolver {
    fn name(&self) -> &str {
        &self.config.command.program
    }

    async fn solve(&self, spec: &SpecText) -> Result<SolverOutput, EngineError> {
        self.config.validate().map_err(EngineError::Config)?;
        self.prepare().await?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| EngineError::Spawn("engine pool is closed".to_string()))?;

        let root = self.config.work_root();
        tokio::fs::create_dir_all(&root).await?;
        let dir = tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&root)?;

        let spec_path = dir.path().join(&self.config.spec_file);
        let output_path = dir.path().join(&self.config.output_file);
        tokio::fs::write(&spec_path, spec.as_str()).await?;
        remove_stale(&output_path).await?;

        let placeholders = [
            spec_path.to_string_lossy().into_owned(),
            output_path.to_string_lossy().into_owned(),
            dir.path().to_string_lossy().into_owned(),
        ];
        tracing::info!(
            engine = %self.config.command.program,
            digest = spec.short_digest(),
            workdir = %dir.path().display(),
            "invoking engine"
        );

        let started = Instant::now();
        let output =
            run_to_completion(&self.config.command, &placeholders, self.config.timeout_secs).await?;
        let elapsed = started.elapsed();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            tracing::warn!(code, elapsed_ms = elapsed.as_millis() as u64, "engine failed");
            return Err(EngineError::NonZeroExit {
                code,
                stderr: excerpt(&output.stderr),
            });
        }

        let raw = match tokio::fs::read_to_string(&output_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::MissingOutput(
                    output_path.display().to_string(),
                ));
            }
            Err(e) => return Err(EngineError::Io(e)),
        };

        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = raw.len(),
            "engine finished"
        );
        Ok(SolverOutput {
            raw,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            elapsed,
        })
    }
}

/// Spawn `cmd` and wait for it, killing it on timeout.
///
/// `placeholders` is `[spec, output, workdir]`; an empty slice leaves the
/// arguments untouched.
async fn run_to_completion(
    cmd: &CommandSpec,
    placeholders: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, EngineError> {
    let args = match placeholders {
        [spec, output, workdir] => substitute(&cmd.args, spec, output, workdir),
        _ => cmd.args.clone(),
    };

    let mut command = Command::new(&cmd.program);
    command
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .map_err(|e| EngineError::Spawn(format!("{}: {}", cmd.program, e)))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(EngineError::Timeout(timeout_secs)),
    }
}

async fn remove_stale(path: &Path) -> Result<(), EngineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale engine output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::Io(e)),
    }
}

fn excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_long_stderr() {
        let long = "x".repeat(STDERR_LIMIT + 10);
        let out = excerpt(long.as_bytes());
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), STDERR_LIMIT + 3);
    }

    #[test]
    fn excerpt_trims_short_stderr() {
        assert_eq!(excerpt(b"  boom\n"), "boom");
    }

    #[test]
    fn concurrency_floor_is_one() {
        let solver = ProcessSolver::new(EngineConfig {
            max_concurrent: 0,
            ..EngineConfig::default()
        });
        assert_eq!(solver.permits.available_permits(), 1);
    }
}
