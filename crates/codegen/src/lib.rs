//! archcheck-codegen: compiles a normalized [`Graph`] into the textual
//! specification consumed by the external constraint solver.
//!
//! The output is the embedded base model followed by one signature and one
//! fact block per entity, the `AnalysisResult` shape listing every solver
//! rule of the catalog, and a `run` directive. Compilation is a pure
//! function of the graph: identical graphs produce byte-identical text.
//!
//! # Public API
//!
//! - [`compile()`] -- graph to [`SpecText`]
//! - [`BASE_MODEL`] -- the embedded base model
//! - [`CodegenError`] -- structural errors found while emitting

mod emit;

use std::fmt;

use archcheck_model::Graph;
use sha2::{Digest, Sha256};

pub use emit::{join_set, scope};

/// Enumerations, entity kinds and rule functions shared by every instance.
pub const BASE_MODEL: &str = include_str!("base_model.als");

/// Module name written at the top of every generated specification.
pub const MODULE_NAME: &str = "archcheck_instance";

/// Error type for specification generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// The graph references an entity the compiler has not declared.
    Structural(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::Structural(msg) => write!(f, "structural error: {}", msg),
        }
    }
}

impl std::error::Error for CodegenError {}

/// A generated specification and the SHA-256 digest of its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecText {
    text: String,
    digest: String,
}

impl SpecText {
    fn new(text: String) -> Self {
        let hash = Sha256::digest(text.as_bytes());
        let digest: String = hash.iter().map(|b| format!("{:02x}", b)).collect();
        SpecText { text, digest }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Lowercase hex SHA-256 of the text.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// First 12 hex characters of the digest, for log lines.
    pub fn short_digest(&self) -> &str {
        &self.digest[..12]
    }
}

/// Compile a graph into solver specification text.
pub fn compile(graph: &Graph) -> Result<SpecText, CodegenError> {
    let text = emit::emit(graph)?;
    let spec = SpecText::new(text);
    tracing::debug!(
        digest = spec.short_digest(),
        bytes = spec.as_str().len(),
        "specification compiled"
    );
    Ok(spec)
}
