//! archcheck-solver: invokes the external constraint engine on a generated
//! specification and returns its raw result.
//!
//! The engine is a black box configured by [`EngineConfig`]: a program and
//! arguments with `{spec}`, `{output}` and `{workdir}` placeholders.
//! [`ProcessSolver`] runs it with a timeout, one fresh work directory per
//! run and a bound on concurrent processes. [`ReplaySolver`] stands in for
//! the engine with a recorded result.

pub mod config;
pub mod error;
pub mod process;
pub mod replay;
pub mod traits;

pub use config::{CommandSpec, EngineConfig};
pub use error::EngineError;
pub use process::ProcessSolver;
pub use replay::ReplaySolver;
pub use traits::{SolverBackend, SolverOutput};
