//! Application state.

use std::sync::Arc;

use archcheck_solver::SolverBackend;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Engine used for every analysis request.
    pub(crate) backend: Arc<dyn SolverBackend>,
}
