//! Deserialization from editor graph JSON into a typed [`Graph`].
//!
//! The main entry point is [`from_graph_json`]. Field spellings from older
//! payloads are accepted through serde aliases; every optional attribute is
//! resolved against its default here and nowhere else.

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::normalize::{resolve_enum, resolve_flag, IdAllocator, IdConflict, IdMap, SafeId};
use crate::types::*;

/// Structural errors in an input graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The payload is not valid JSON.
    Json(String),
    /// The payload is JSON but not a graph.
    InvalidShape(String),
    /// An entity that must carry an id has none.
    MissingId { kind: EntityKind, index: usize },
    /// The same id is declared twice for one kind.
    DuplicateId { kind: EntityKind, id: String },
    /// Two distinct ids sanitize to the same identifier.
    IdCollision {
        kind: EntityKind,
        first: String,
        second: String,
        safe: String,
    },
    /// A system is not placed in any zone.
    MissingLocation { system: String },
    /// A reference names an entity that was never declared.
    DanglingReference {
        kind: EntityKind,
        id: String,
        field: &'static str,
        target: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Json(msg) => write!(f, "invalid JSON: {}", msg),
            ModelError::InvalidShape(msg) => write!(f, "invalid graph: {}", msg),
            ModelError::MissingId { kind, index } => {
                write!(f, "{} at index {} has no id", kind, index)
            }
            ModelError::DuplicateId { kind, id } => {
                write!(f, "{} '{}' is declared more than once", kind, id)
            }
            ModelError::IdCollision {
                kind,
                first,
                second,
                safe,
            } => write!(
                f,
                "{} ids '{}' and '{}' both normalize to '{}'",
                kind, first, second, safe
            ),
            ModelError::MissingLocation { system } => {
                write!(f, "System '{}' has no location", system)
            }
            ModelError::DanglingReference {
                kind,
                id,
                field,
                target,
            } => write!(
                f,
                "{} '{}': {} references undeclared '{}'",
                kind, id, field, target
            ),
        }
    }
}

impl std::error::Error for ModelError {}

// ── Raw payload ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawGraph {
    #[serde(default)]
    locations: Option<Vec<RawLocation>>,
    #[serde(default)]
    data: Option<Vec<RawData>>,
    #[serde(default)]
    systems: Option<Vec<RawSystem>>,
    #[serde(default)]
    connections: Option<Vec<RawConnection>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLocation {
    id: Option<Value>,
    grade: Option<Value>,
    #[serde(rename = "type")]
    zone_type: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawData {
    id: Option<Value>,
    grade: Option<Value>,
    #[serde(rename = "fileType", alias = "contentType")]
    file_type: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSystem {
    id: Option<Value>,
    grade: Option<Value>,
    #[serde(alias = "loc")]
    location: Option<Value>,
    #[serde(rename = "type")]
    system_type: Option<Value>,
    #[serde(rename = "authType")]
    auth_type: Option<Value>,
    #[serde(rename = "isCDS")]
    is_cds: Option<Value>,
    #[serde(rename = "isRegistered", alias = "is_registered")]
    is_registered: Option<Value>,
    #[serde(rename = "isStorageEncrypted")]
    is_storage_encrypted: Option<Value>,
    #[serde(rename = "isManagement")]
    is_management: Option<Value>,
    isolation: Option<Value>,
    #[serde(rename = "hasMDM")]
    has_mdm: Option<Value>,
    #[serde(rename = "patchStatus", alias = "patch_status")]
    patch_status: Option<Value>,
    #[serde(rename = "lifeCycle", alias = "eol_status")]
    life_cycle: Option<Value>,
    #[serde(rename = "hasAuditLogging", alias = "audit_log")]
    has_audit_logging: Option<Value>,
    #[serde(rename = "hasSecureClock", alias = "ntp_sync")]
    has_secure_clock: Option<Value>,
    #[serde(rename = "sessionPolicy", alias = "session_policy")]
    session_policy: Option<Value>,
    stores: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConnection {
    id: Option<Value>,
    from: Option<Value>,
    to: Option<Value>,
    carries: Option<Value>,
    protocol: Option<Value>,
    #[serde(rename = "isEncrypted")]
    is_encrypted: Option<Value>,
    #[serde(rename = "hasCDR")]
    has_cdr: Option<Value>,
    #[serde(rename = "hasDLP")]
    has_dlp: Option<Value>,
    #[serde(rename = "hasAntiVirus")]
    has_anti_virus: Option<Value>,
}

// ── Entry points ────────────────────────────────────────────────────

/// Parse and normalize a graph from JSON text.
pub fn from_graph_str(text: &str) -> Result<Graph, ModelError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ModelError::Json(e.to_string()))?;
    from_graph_json(&value)
}

/// Normalize an untrusted graph payload.
///
/// Missing top-level lists are empty. Stored or carried data ids that were
/// never declared are materialized as inferred Sensitive documents.
pub fn from_graph_json(value: &Value) -> Result<Graph, ModelError> {
    if !value.is_object() {
        return Err(ModelError::InvalidShape(
            "top-level value must be an object".to_string(),
        ));
    }
    let raw = RawGraph::deserialize(value).map_err(|e| ModelError::InvalidShape(e.to_string()))?;

    let mut graph = Graph::default();
    let mut alloc = IdAllocator::new();

    for (index, loc) in raw.locations.unwrap_or_default().into_iter().enumerate() {
        let raw_id = required_id(loc.id.as_ref(), EntityKind::Location, index)?;
        let safe = register(&mut graph.ids.locations, EntityKind::Location, &raw_id, index)?;
        graph.locations.push(Location {
            id: EntityId { raw: raw_id, safe },
            grade: resolve_enum(loc.grade.as_ref(), Grade::Open),
            zone_type: resolve_enum(loc.zone_type.as_ref(), ZoneType::Internet),
        });
    }

    for (index, d) in raw.data.unwrap_or_default().into_iter().enumerate() {
        let raw_id = required_id(d.id.as_ref(), EntityKind::Data, index)?;
        let safe = register(&mut graph.ids.data, EntityKind::Data, &raw_id, index)?;
        graph.data.push(DataAsset {
            id: EntityId { raw: raw_id, safe },
            grade: resolve_enum(d.grade.as_ref(), Grade::Open),
            file_type: resolve_enum(d.file_type.as_ref(), ContentType::Document),
            inferred: false,
        });
    }

    for (index, sys) in raw.systems.unwrap_or_default().into_iter().enumerate() {
        let raw_id = required_id(sys.id.as_ref(), EntityKind::System, index)?;
        let safe = register(&mut graph.ids.systems, EntityKind::System, &raw_id, index)?;

        let loc_raw = sys
            .location
            .as_ref()
            .and_then(id_string)
            .ok_or_else(|| ModelError::MissingLocation {
                system: raw_id.clone(),
            })?;
        let location = graph
            .ids
            .locations
            .safe_for(&loc_raw)
            .cloned()
            .ok_or_else(|| ModelError::DanglingReference {
                kind: EntityKind::System,
                id: raw_id.clone(),
                field: "location",
                target: loc_raw.clone(),
            })?;

        let stores = data_refs(&mut graph, sys.stores.as_ref(), EntityKind::System, &raw_id)?;

        graph.systems.push(System {
            id: EntityId { raw: raw_id, safe },
            grade: resolve_enum(sys.grade.as_ref(), Grade::Open),
            location,
            system_type: resolve_enum(sys.system_type.as_ref(), SystemType::Server),
            auth_type: resolve_enum(sys.auth_type.as_ref(), AuthType::IdPw),
            is_cds: resolve_flag(sys.is_cds.as_ref(), false),
            is_registered: resolve_flag(sys.is_registered.as_ref(), true),
            is_storage_encrypted: resolve_flag(sys.is_storage_encrypted.as_ref(), false),
            is_management: resolve_flag(sys.is_management.as_ref(), false),
            isolation: resolve_enum(sys.isolation.as_ref(), Isolation::NoIsolation),
            has_mdm: resolve_flag(sys.has_mdm.as_ref(), false),
            patch_status: resolve_enum(sys.patch_status.as_ref(), PatchStatus::UpToDate),
            life_cycle: resolve_enum(sys.life_cycle.as_ref(), LifeCycle::Active),
            has_audit_logging: resolve_flag(sys.has_audit_logging.as_ref(), false),
            has_secure_clock: resolve_flag(sys.has_secure_clock.as_ref(), false),
            session_policy: resolve_enum(sys.session_policy.as_ref(), SessionPolicy::Unsafe),
            stores,
        });
    }

    let raw_connections = raw.connections.unwrap_or_default();
    // Explicit ids are reserved up front so synthesized ones never shadow them.
    let explicit: BTreeSet<String> = raw_connections
        .iter()
        .filter_map(|c| c.id.as_ref().and_then(id_string))
        .collect();

    for (index, conn) in raw_connections.into_iter().enumerate() {
        let raw_id = match conn.id.as_ref().and_then(id_string) {
            Some(id) => id,
            None => {
                let taken = &graph.ids.connections;
                let id = alloc.allocate("conn", |c| explicit.contains(c) || taken.is_taken(c));
                tracing::debug!(index, id = %id, "synthesized connection id");
                id
            }
        };
        let safe = register(
            &mut graph.ids.connections,
            EntityKind::Connection,
            &raw_id,
            index,
        )?;

        let from = endpoint(&graph, conn.from.as_ref(), &raw_id, "from")?;
        let to = endpoint(&graph, conn.to.as_ref(), &raw_id, "to")?;
        let carries = data_refs(
            &mut graph,
            conn.carries.as_ref(),
            EntityKind::Connection,
            &raw_id,
        )?;

        graph.connections.push(Connection {
            id: EntityId { raw: raw_id, safe },
            from,
            to,
            carries,
            protocol: resolve_enum(conn.protocol.as_ref(), Protocol::Http),
            is_encrypted: resolve_flag(conn.is_encrypted.as_ref(), false),
            has_cdr: resolve_flag(conn.has_cdr.as_ref(), false),
            has_dlp: resolve_flag(conn.has_dlp.as_ref(), false),
            has_anti_virus: resolve_flag(conn.has_anti_virus.as_ref(), false),
        });
    }

    tracing::debug!(
        locations = graph.locations.len(),
        data = graph.data.len(),
        systems = graph.systems.len(),
        connections = graph.connections.len(),
        "graph normalized"
    );
    Ok(graph)
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Ids may arrive as strings or numbers.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_id(value: Option<&Value>, kind: EntityKind, index: usize) -> Result<String, ModelError> {
    value
        .and_then(id_string)
        .ok_or(ModelError::MissingId { kind, index })
}

fn register(
    map: &mut IdMap,
    kind: EntityKind,
    raw_id: &str,
    index: usize,
) -> Result<SafeId, ModelError> {
    map.insert(raw_id, index).map_err(|conflict| match conflict {
        IdConflict::Duplicate => ModelError::DuplicateId {
            kind,
            id: raw_id.to_string(),
        },
        IdConflict::Collision { safe, existing } => ModelError::IdCollision {
            kind,
            first: existing,
            second: raw_id.to_string(),
            safe: safe.to_string(),
        },
    })
}

fn endpoint(
    graph: &Graph,
    value: Option<&Value>,
    conn_id: &str,
    field: &'static str,
) -> Result<SafeId, ModelError> {
    let target = value.and_then(id_string).unwrap_or_default();
    graph
        .ids
        .systems
        .safe_for(&target)
        .cloned()
        .ok_or_else(|| ModelError::DanglingReference {
            kind: EntityKind::Connection,
            id: conn_id.to_string(),
            field,
            target,
        })
}

/// A `stores` / `carries` list: a JSON array of ids, or one
/// comma-separated string as the editor emits it.
fn ref_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(id_string).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

fn data_refs(
    graph: &mut Graph,
    value: Option<&Value>,
    owner_kind: EntityKind,
    owner: &str,
) -> Result<Vec<SafeId>, ModelError> {
    let mut out = Vec::new();
    for raw_id in ref_list(value) {
        if let Some(safe) = graph.ids.data.safe_for(&raw_id) {
            out.push(safe.clone());
            continue;
        }
        let index = graph.data.len();
        let safe = register(&mut graph.ids.data, EntityKind::Data, &raw_id, index)?;
        tracing::warn!(
            data = %raw_id,
            owner_kind = %owner_kind,
            owner = owner,
            "undeclared data asset referenced; inferring Sensitive document"
        );
        graph.data.push(DataAsset {
            id: EntityId {
                raw: raw_id,
                safe: safe.clone(),
            },
            grade: Grade::Sensitive,
            file_type: ContentType::Document,
            inferred: true,
        });
        out.push(safe);
    }
    Ok(out)
}
