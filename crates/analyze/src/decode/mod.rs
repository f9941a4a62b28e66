//! Engine output decoding.
//!
//! The engine writes an XML-like instance: `<field label="...">` elements
//! holding `<tuple>`s of `<atom label="..."/>`s. [`decode`] turns that into
//! a [`RelationTable`] keyed by field label, with every atom label cleaned
//! back to the sanitized id the compiler embedded.

mod lexer;
mod parser;

use std::collections::BTreeMap;

use archcheck_model::EntityKind;
use serde::Serialize;

pub use archcheck_model::atom_label;

/// Malformed engine output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed engine output at byte {offset}: {message}")]
pub struct DecodeError {
    pub offset: usize,
    pub message: String,
}

impl DecodeError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        DecodeError {
            offset,
            message: message.into(),
        }
    }
}

/// Tuples per field label, in document order. A label that appears on
/// several signatures accumulates all of their tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RelationTable {
    fields: BTreeMap<String, Vec<Vec<String>>>,
}

impl RelationTable {
    /// Tuples of `label`; empty if the field is absent.
    pub fn get(&self, label: &str) -> &[Vec<String>] {
        self.fields.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the output declared the field at all, even with no tuples.
    pub fn contains(&self, label: &str) -> bool {
        self.fields.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Total number of tuples across all fields.
    pub fn tuple_count(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Recover the sanitized id from an engine atom label.
///
/// Drops the namespace (through the last `/`), the disambiguation suffix
/// (from the first `$`) and one entity-kind prefix:
/// `this/System_web_01$0` becomes `web_01`.
pub fn clean_atom_label(label: &str) -> String {
    let tail = match label.rfind('/') {
        Some(i) => &label[i + 1..],
        None => label,
    };
    let base = match tail.find('$') {
        Some(i) => &tail[..i],
        None => tail,
    };
    for kind in EntityKind::ALL {
        if let Some(rest) = base.strip_prefix(kind.prefix()) {
            return rest.to_string();
        }
    }
    base.to_string()
}

/// Parse raw engine output into a relation table.
pub fn decode(raw: &str) -> Result<RelationTable, DecodeError> {
    let tokens = lexer::lex(raw)?;
    let root = parser::parse(&tokens, raw.len())?;

    let mut table = RelationTable::default();
    for field in root.walk().into_iter().filter(|e| e.name == "field") {
        let Some(label) = field.attr("label") else {
            tracing::debug!(offset = field.offset, "field without label ignored");
            continue;
        };
        let tuples = table.fields.entry(label.to_string()).or_default();
        for tuple in field.children_named("tuple") {
            let atoms: Vec<String> = tuple
                .children_named("atom")
                .filter_map(|a| a.attr("label"))
                .map(clean_atom_label)
                .collect();
            tuples.push(atoms);
        }
    }

    tracing::debug!(
        fields = table.fields.len(),
        tuples = table.tuple_count(),
        "engine output decoded"
    );
    Ok(table)
}
