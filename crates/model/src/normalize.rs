//! Identifier sanitizing and enumeration resolution.
//!
//! Editor ids are free-form (numbers, UUIDs, labels with spaces). Anything
//! embedded into the generated model must be a plain identifier, and every
//! decoded atom must map back to the id the editor knows.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::types::{AtomEnum, EntityKind};

/// An identifier safe to embed in the generated model: ASCII letters,
/// digits and `_`, starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SafeId(String);

impl SafeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sanitize a raw id. Total and idempotent.
pub fn normalize_id(raw: &str) -> SafeId {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.insert_str(0, "id_");
    }
    SafeId(out)
}

/// Atom name of an entity in the generated model, e.g. `System_web_01`.
pub fn atom_label(kind: EntityKind, safe: &SafeId) -> String {
    format!("{}{}", kind.prefix(), safe)
}

/// Resolve a raw JSON value against enumeration `E`.
///
/// Strings are matched against the atom name and its aliases, exactly
/// first and then ignoring ASCII case. Anything else, including `null`,
/// yields `default`.
pub fn resolve_enum<E: AtomEnum>(raw: Option<&Value>, default: E) -> E {
    let Some(Value::String(s)) = raw else {
        return default;
    };
    let s = s.trim();
    let spellings = |e: &E| std::iter::once(e.atom()).chain(e.aliases().iter().copied());

    if let Some(hit) = E::ALL.iter().find(|e| spellings(*e).any(|n| n == s)) {
        return *hit;
    }
    if let Some(hit) = E::ALL
        .iter()
        .find(|e| spellings(*e).any(|n| n.eq_ignore_ascii_case(s)))
    {
        return *hit;
    }
    tracing::debug!(value = s, sig = E::SIG, "unrecognized enumeration value, using default");
    default
}

/// Resolve a raw JSON value as a `True`/`False` flag.
pub fn resolve_flag(raw: Option<&Value>, default: bool) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => default,
        },
        Some(Value::String(s)) => match s.trim() {
            "true" | "True" | "TRUE" | "1" | "yes" | "Yes" => true,
            "false" | "False" | "FALSE" | "0" | "no" | "No" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Why an id could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdConflict {
    /// The same raw id was declared twice.
    Duplicate,
    /// A different raw id already sanitizes to the same value.
    Collision { safe: SafeId, existing: String },
}

/// Bidirectional sanitized/original id table for one entity kind.
///
/// Each entry also remembers the entity's position in its input list.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    by_safe: BTreeMap<SafeId, (String, usize)>,
    by_raw: BTreeMap<String, SafeId>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, raw: &str, index: usize) -> Result<SafeId, IdConflict> {
        if self.by_raw.contains_key(raw) {
            return Err(IdConflict::Duplicate);
        }
        let safe = normalize_id(raw);
        if let Some((existing, _)) = self.by_safe.get(&safe) {
            return Err(IdConflict::Collision {
                safe,
                existing: existing.clone(),
            });
        }
        self.by_safe.insert(safe.clone(), (raw.to_string(), index));
        self.by_raw.insert(raw.to_string(), safe.clone());
        Ok(safe)
    }

    pub fn safe_for(&self, raw: &str) -> Option<&SafeId> {
        self.by_raw.get(raw)
    }

    pub fn raw_for(&self, safe: &SafeId) -> Option<&str> {
        self.by_safe.get(safe).map(|(raw, _)| raw.as_str())
    }

    pub fn index_of(&self, safe: &SafeId) -> Option<usize> {
        self.by_safe.get(safe).map(|(_, i)| *i)
    }

    /// True if `raw` is declared, or if its sanitized form is already taken.
    pub fn is_taken(&self, raw: &str) -> bool {
        self.by_raw.contains_key(raw) || self.by_safe.contains_key(&normalize_id(raw))
    }

    pub fn len(&self) -> usize {
        self.by_safe.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_safe.is_empty()
    }
}

/// Request-scoped counter for synthesized ids.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `<prefix>_<n>` for which `is_taken` is false.
    pub fn allocate(&mut self, prefix: &str, is_taken: impl Fn(&str) -> bool) -> String {
        loop {
            let candidate = format!("{}_{}", prefix, self.next);
            self.next += 1;
            if !is_taken(&candidate) {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthType, Grade, Isolation, SessionPolicy};
    use serde_json::json;

    #[test]
    fn plain_ids_pass_through() {
        assert_eq!(normalize_id("web01").as_str(), "web01");
        assert_eq!(normalize_id("Web_Server").as_str(), "Web_Server");
    }

    #[test]
    fn unsafe_characters_become_underscores() {
        assert_eq!(normalize_id("web-01.prod").as_str(), "web_01_prod");
        assert_eq!(normalize_id("a b").as_str(), "a_b");
    }

    #[test]
    fn numeric_and_empty_ids_are_prefixed() {
        assert_eq!(normalize_id("1").as_str(), "id_1");
        assert_eq!(normalize_id("").as_str(), "id_");
        assert_eq!(normalize_id("_x").as_str(), "id__x");
        assert_eq!(normalize_id("한글").as_str(), "id___");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["1", "web-01", "", "abc", "9 lives", "$x"] {
            let once = normalize_id(raw);
            assert_eq!(normalize_id(once.as_str()), once);
        }
    }

    #[test]
    fn atom_labels_are_kind_prefixed() {
        let safe = normalize_id("web-01");
        assert_eq!(atom_label(EntityKind::System, &safe), "System_web_01");
        assert_eq!(atom_label(EntityKind::Data, &safe), "Data_web_01");
    }

    #[test]
    fn enum_exact_and_case_insensitive() {
        assert_eq!(
            resolve_enum(Some(&json!("Classified")), Grade::Open),
            Grade::Classified
        );
        assert_eq!(
            resolve_enum(Some(&json!("sensitive")), Grade::Open),
            Grade::Sensitive
        );
    }

    #[test]
    fn enum_unknown_or_missing_falls_back() {
        assert_eq!(resolve_enum(Some(&json!("TopSecret")), Grade::Open), Grade::Open);
        assert_eq!(resolve_enum(None, Grade::Open), Grade::Open);
        assert_eq!(resolve_enum(Some(&json!(2)), Grade::Open), Grade::Open);
        assert_eq!(
            resolve_enum(Some(&Value::Null), SessionPolicy::Unsafe),
            SessionPolicy::Unsafe
        );
    }

    #[test]
    fn none_alias_resolves_per_enumeration() {
        assert_eq!(resolve_enum(Some(&json!("None")), AuthType::IdPw), AuthType::NoAuth);
        assert_eq!(
            resolve_enum(Some(&json!("None")), Isolation::Vdi),
            Isolation::NoIsolation
        );
    }

    #[test]
    fn flags_accept_loose_spellings() {
        assert!(resolve_flag(Some(&json!(true)), false));
        assert!(resolve_flag(Some(&json!(1)), false));
        assert!(resolve_flag(Some(&json!("True")), false));
        assert!(resolve_flag(Some(&json!("yes")), false));
        assert!(!resolve_flag(Some(&json!(0)), true));
        assert!(!resolve_flag(Some(&json!("False")), true));
        assert!(!resolve_flag(Some(&json!("no")), true));
        assert!(resolve_flag(Some(&json!("maybe")), true));
        assert!(!resolve_flag(None, false));
    }

    #[test]
    fn id_map_round_trips() {
        let mut map = IdMap::new();
        let safe = map.insert("web-01", 0).unwrap();
        assert_eq!(safe.as_str(), "web_01");
        assert_eq!(map.raw_for(&safe), Some("web-01"));
        assert_eq!(map.safe_for("web-01"), Some(&safe));
        assert_eq!(map.index_of(&safe), Some(0));
    }

    #[test]
    fn id_map_rejects_collisions_and_duplicates() {
        let mut map = IdMap::new();
        map.insert("a-b", 0).unwrap();
        match map.insert("a.b", 1) {
            Err(IdConflict::Collision { safe, existing }) => {
                assert_eq!(safe.as_str(), "a_b");
                assert_eq!(existing, "a-b");
            }
            other => panic!("expected collision, got {:?}", other),
        }
        assert_eq!(map.insert("a-b", 2), Err(IdConflict::Duplicate));
    }

    #[test]
    fn allocator_skips_taken_ids() {
        let mut map = IdMap::new();
        map.insert("conn_0", 0).unwrap();
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.allocate("conn", |c| map.is_taken(c)), "conn_1");
        assert_eq!(alloc.allocate("conn", |c| map.is_taken(c)), "conn_2");
    }

    #[test]
    fn allocators_are_independent() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        assert_eq!(a.allocate("conn", |_| false), "conn_0");
        assert_eq!(b.allocate("conn", |_| false), "conn_0");
    }
}
