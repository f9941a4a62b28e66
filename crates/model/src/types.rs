//! Typed domain graph: zones, data assets, systems and connections.
//!
//! Every attribute here is already resolved against its default. The raw,
//! loosely-typed editor payload never leaves [`crate::deserialize`].

use std::fmt;

use serde::Serialize;

use crate::normalize::{IdMap, SafeId};

/// A closed enumeration rendered as atoms in the generated model.
///
/// `SIG` is the abstract signature the atoms extend; `atom()` is the name
/// emitted into the specification text and the canonical input spelling.
/// `aliases()` lists additional input spellings accepted by
/// [`crate::resolve_enum`].
pub trait AtomEnum: Copy + Eq + 'static {
    const SIG: &'static str;
    const ALL: &'static [Self];

    fn atom(self) -> &'static str;

    fn aliases(self) -> &'static [&'static str];
}

macro_rules! atom_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $sig:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $atom:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl AtomEnum for $name {
            const SIG: &'static str = $sig;
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn atom(self) -> &'static str {
                match self {
                    $( $name::$variant => $atom ),+
                }
            }

            fn aliases(self) -> &'static [&'static str] {
                match self {
                    $( $name::$variant => &[ $( $alias ),* ] ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.atom())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.atom())
            }
        }
    };
}

atom_enum! {
    /// Security classification. Declaration order is the grade order:
    /// `Open < Sensitive < Classified`.
    Grade: "Grade" {
        Open => "Open",
        Sensitive => "Sensitive",
        Classified => "Classified",
    }
}

impl Grade {
    /// Sensitive or above.
    pub fn is_critical(self) -> bool {
        self >= Grade::Sensitive
    }
}

atom_enum! {
    /// Network type of a zone.
    ZoneType: "ZoneType" {
        Internet => "Internet",
        Intranet => "Intranet",
        Dmz => "DMZ",
        Wireless => "Wireless",
        Cloud => "Cloud",
    }
}

impl ZoneType {
    /// Zones reachable from outside the organisation.
    pub fn is_external(self) -> bool {
        matches!(self, ZoneType::Internet | ZoneType::Dmz | ZoneType::Cloud)
    }
}

atom_enum! {
    ContentType: "ContentType" {
        Document => "Document",
        Executable => "Executable",
        Media => "Media",
        Archive => "Archive",
        Database => "Database",
    }
}

atom_enum! {
    SystemType: "SystemType" {
        Server => "Server",
        Pc => "PC",
        Terminal => "Terminal",
        Mobile => "Mobile",
        SecurityDevice => "SecurityDevice",
        Gateway => "Gateway",
        Iot => "IoT",
    }
}

atom_enum! {
    /// `None` collides with the isolation enumeration in the generated
    /// model, so both carry a prefixed atom and accept `None` as an alias.
    AuthType: "AuthType" {
        NoAuth => "AuthNone" | "None",
        Single => "Single",
        IdPw => "ID_PW" | "IDPW",
        Mfa => "MFA",
    }
}

atom_enum! {
    Isolation: "Isolation" {
        NoIsolation => "IsolationNone" | "None",
        Vdi => "VDI",
        Rbi => "RBI",
        AirGap => "AirGap",
    }
}

atom_enum! {
    PatchStatus: "PatchStatus" {
        UpToDate => "UpToDate",
        Vulnerable => "Vulnerable",
    }
}

atom_enum! {
    LifeCycle: "LifeCycle" {
        Active => "Active",
        Eol => "EOL",
    }
}

atom_enum! {
    SessionPolicy: "SessionPolicy" {
        Unsafe => "Unsafe",
        TimeoutOnly => "Timeout_Only",
        Strict => "Strict_Timeout_Concurrency",
    }
}

atom_enum! {
    Protocol: "Protocol" {
        Http => "HTTP",
        Https => "HTTPS",
        Ssh => "SSH",
        Ftp => "FTP",
        Sftp => "SFTP",
        Telnet => "Telnet",
        Tcp => "TCP",
        Udp => "UDP",
        Vpn => "VPN",
    }
}

/// The four entity categories of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Location,
    Data,
    System,
    Connection,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Location,
        EntityKind::Data,
        EntityKind::System,
        EntityKind::Connection,
    ];

    /// Abstract signature the entity's atoms extend.
    pub fn sig(self) -> &'static str {
        match self {
            EntityKind::Location => "Location",
            EntityKind::Data => "Data",
            EntityKind::System => "System",
            EntityKind::Connection => "Connection",
        }
    }

    /// Prefix prepended to a sanitized id so atoms of different kinds
    /// never share a name.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Location => "Location_",
            EntityKind::Data => "Data_",
            EntityKind::System => "System_",
            EntityKind::Connection => "Connection_",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sig())
    }
}

/// Original id as supplied by the editor, plus its sanitized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityId {
    pub raw: String,
    pub safe: SafeId,
}

/// A zone.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub id: EntityId,
    pub grade: Grade,
    pub zone_type: ZoneType,
}

/// A data asset. `inferred` is set when the asset was referenced by a
/// system or connection but never declared.
#[derive(Debug, Clone, Serialize)]
pub struct DataAsset {
    pub id: EntityId,
    pub grade: Grade,
    pub file_type: ContentType,
    pub inferred: bool,
}

/// A node of the architecture.
#[derive(Debug, Clone, Serialize)]
pub struct System {
    pub id: EntityId,
    pub grade: Grade,
    pub location: SafeId,
    pub system_type: SystemType,
    pub auth_type: AuthType,
    pub is_cds: bool,
    pub is_registered: bool,
    pub is_storage_encrypted: bool,
    pub is_management: bool,
    pub isolation: Isolation,
    pub has_mdm: bool,
    pub patch_status: PatchStatus,
    pub life_cycle: LifeCycle,
    pub has_audit_logging: bool,
    pub has_secure_clock: bool,
    pub session_policy: SessionPolicy,
    pub stores: Vec<SafeId>,
}

/// A directed edge between two systems.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: EntityId,
    pub from: SafeId,
    pub to: SafeId,
    pub carries: Vec<SafeId>,
    pub protocol: Protocol,
    pub is_encrypted: bool,
    pub has_cdr: bool,
    pub has_dlp: bool,
    pub has_anti_virus: bool,
}

/// Per-kind sanitized/original id tables.
#[derive(Debug, Clone, Default)]
pub struct IdMaps {
    pub locations: IdMap,
    pub data: IdMap,
    pub systems: IdMap,
    pub connections: IdMap,
}

impl IdMaps {
    pub fn for_kind(&self, kind: EntityKind) -> &IdMap {
        match kind {
            EntityKind::Location => &self.locations,
            EntityKind::Data => &self.data,
            EntityKind::System => &self.systems,
            EntityKind::Connection => &self.connections,
        }
    }
}

/// A fully normalized architecture graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub locations: Vec<Location>,
    pub data: Vec<DataAsset>,
    pub systems: Vec<System>,
    pub connections: Vec<Connection>,
    pub ids: IdMaps,
}

impl Graph {
    pub fn location(&self, id: &SafeId) -> Option<&Location> {
        self.ids
            .locations
            .index_of(id)
            .and_then(|i| self.locations.get(i))
    }

    /// Zone the system is placed in.
    pub fn zone_of(&self, system: &System) -> Option<&Location> {
        self.location(&system.location)
    }

    /// Number of entities of the given kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Location => self.locations.len(),
            EntityKind::Data => self.data.len(),
            EntityKind::System => self.systems.len(),
            EntityKind::Connection => self.connections.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_order_is_total_and_transitive() {
        let grades = Grade::ALL;
        assert!(Grade::Open < Grade::Sensitive);
        assert!(Grade::Sensitive < Grade::Classified);
        assert!(Grade::Open < Grade::Classified);
        for a in grades {
            for b in grades {
                let exactly_one = [a < b, a == b, a > b].iter().filter(|x| **x).count();
                assert_eq!(exactly_one, 1, "{} vs {}", a, b);
                for c in grades {
                    if a < b && b < c {
                        assert!(a < c);
                    }
                }
            }
        }
    }

    #[test]
    fn sensitive_and_above_are_critical() {
        assert!(!Grade::Open.is_critical());
        assert!(Grade::Sensitive.is_critical());
        assert!(Grade::Classified.is_critical());
    }

    #[test]
    fn grade_order_is_not_string_order() {
        // "Classified" < "Open" lexically, but not by grade.
        assert!("Classified" < "Open");
        assert!(Grade::Classified > Grade::Open);
    }

    #[test]
    fn atoms_are_unique_across_enumerations() {
        let mut atoms: Vec<&str> = Vec::new();
        atoms.extend(Grade::ALL.iter().map(|g| g.atom()));
        atoms.extend(ZoneType::ALL.iter().map(|g| g.atom()));
        atoms.extend(ContentType::ALL.iter().map(|g| g.atom()));
        atoms.extend(SystemType::ALL.iter().map(|g| g.atom()));
        atoms.extend(AuthType::ALL.iter().map(|g| g.atom()));
        atoms.extend(Isolation::ALL.iter().map(|g| g.atom()));
        atoms.extend(PatchStatus::ALL.iter().map(|g| g.atom()));
        atoms.extend(LifeCycle::ALL.iter().map(|g| g.atom()));
        atoms.extend(SessionPolicy::ALL.iter().map(|g| g.atom()));
        atoms.extend(Protocol::ALL.iter().map(|g| g.atom()));
        let total = atoms.len();
        atoms.sort();
        atoms.dedup();
        assert_eq!(atoms.len(), total);
    }

    #[test]
    fn enum_serializes_as_atom() {
        assert_eq!(
            serde_json::to_value(SessionPolicy::Strict).unwrap(),
            serde_json::json!("Strict_Timeout_Concurrency")
        );
    }
}
