use std::time::Duration;

use archcheck_codegen::SpecText;
use async_trait::async_trait;

use crate::error::EngineError;

/// Raw result of one engine run.
#[derive(Debug, Clone)]
pub struct SolverOutput {
    /// Contents of the engine's result file.
    pub raw: String,
    /// Captured standard output, kept for diagnostics.
    pub stdout: String,
    pub elapsed: Duration,
}

/// A constraint solver that evaluates a generated specification.
///
/// Implementations must be `Send + Sync + 'static` to be shared through
/// axum application state and across async task boundaries.
#[async_trait]
pub trait SolverBackend: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Evaluate `spec` and return the engine's raw result.
    async fn solve(&self, spec: &SpecText) -> Result<SolverOutput, EngineError>;
}
