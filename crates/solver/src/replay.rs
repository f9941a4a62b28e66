use std::time::Duration;

use archcheck_codegen::SpecText;
use async_trait::async_trait;

use crate::error::EngineError;
use crate::traits::{SolverBackend, SolverOutput};

/// Replays a recorded engine result instead of running the engine.
///
/// Used to re-analyze a graph against saved output, and as the fake engine
/// in tests. With no recording, every solve reports missing output.
#[derive(Debug, Clone, Default)]
pub struct ReplaySolver {
    recorded: Option<String>,
}

impl ReplaySolver {
    pub fn new(recorded: impl Into<String>) -> Self {
        ReplaySolver {
            recorded: Some(recorded.into()),
        }
    }

    /// A backend whose engine never writes a result.
    pub fn without_output() -> Self {
        ReplaySolver { recorded: None }
    }
}

#[async_trait]
impl SolverBackend for ReplaySolver {
    fn name(&self) -> &str {
        "replay"
    }

    async fn solve(&self, spec: &SpecText) -> Result<SolverOutput, EngineError> {
        tracing::debug!(digest = spec.short_digest(), "replaying recorded engine output");
        match &self.recorded {
            Some(raw) => Ok(SolverOutput {
                raw: raw.clone(),
                stdout: String::new(),
                elapsed: Duration::ZERO,
            }),
            None => Err(EngineError::MissingOutput("replay".to_string())),
        }
    }
}
