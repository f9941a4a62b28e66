//! archcheck-model: network architecture graph types shared by the
//! compiler, the fast-path rule engine and the result classifier.
//!
//! The editor hands us loosely-typed JSON. [`from_graph_json`] resolves every
//! optional field against its default exactly once, so every consumer sees
//! the same fully-typed [`Graph`].
//!
//! # Public API
//!
//! - [`from_graph_json()`] / [`from_graph_str()`] -- untrusted JSON to [`Graph`]
//! - [`normalize_id()`], [`resolve_enum()`], [`resolve_flag()`] -- the normalizer
//! - [`RuleKey`], [`Arity`], [`Engine`] -- the rule catalog
//! - [`ModelError`] -- structural errors

pub mod catalog;
pub mod deserialize;
pub mod normalize;
pub mod types;

pub use catalog::{Arity, Engine, RuleKey};
pub use deserialize::{from_graph_json, from_graph_str, ModelError};
pub use normalize::{atom_label, normalize_id, resolve_enum, resolve_flag, IdAllocator, IdMap, SafeId};
pub use types::*;
