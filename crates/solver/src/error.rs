/// Errors raised while invoking the external engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine process could not be started.
    #[error("failed to start engine: {0}")]
    Spawn(String),

    /// The engine configuration cannot be run safely.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// The one-time prepare command failed.
    #[error("engine prepare step failed: {0}")]
    Prepare(String),

    /// The engine ran but reported failure.
    #[error("engine exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// The engine did not finish within the configured timeout.
    #[error("engine timed out after {0} seconds")]
    Timeout(u64),

    /// The engine exited cleanly without writing its result file.
    #[error("engine produced no output at {0}")]
    MissingOutput(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the caller may continue without solver results.
    ///
    /// Only a clean exit with no result file qualifies; every other failure
    /// means the engine itself is broken or overloaded.
    pub fn is_degradable(&self) -> bool {
        matches!(self, EngineError::MissingOutput(_))
    }
}
