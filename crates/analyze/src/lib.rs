//! archcheck-analyze -- turns engine output and the graph into a violation
//! report.
//!
//! - [`decode`] parses the engine's XML-like result into a [`RelationTable`]
//! - [`classify`] maps catalogued fields to [`ViolationRecord`]s
//! - [`fastpath`] evaluates the in-process rules directly on the graph
//! - [`merge`] groups records describing the same finding
//! - [`pipeline`] runs one request end to end against a [`SolverBackend`]
//!
//! [`SolverBackend`]: archcheck_solver::SolverBackend

pub mod classify;
pub mod decode;
pub mod fastpath;
pub mod merge;
pub mod pipeline;
pub mod report;

pub use classify::{classify, Classification, ConsistencyWarning, Subject, ThreatMap, ViolationRecord};
pub use decode::{clean_atom_label, decode, DecodeError, RelationTable};
pub use merge::{merge, MergedThreats, MergedViolationGroup};
pub use pipeline::{analyze_graph, fast_report, interpret, run_analysis, ErrorKind, PipelineError};
pub use report::{SolverStatus, ViolationReport};
