//! The rule catalog: every violation kind the checker can report.
//!
//! Solver rules are declared in the generated result shape and evaluated by
//! the external engine. Fast-path rules are single-system attribute checks
//! evaluated in-process. The two key sets are disjoint.

use std::fmt;

use serde::Serialize;

use crate::types::EntityKind;

/// Shape of a violation tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Arity {
    System,
    Connection,
    SystemData,
    ConnectionData,
}

impl Arity {
    /// Kind of the primary subject.
    pub fn subject(self) -> EntityKind {
        match self {
            Arity::System | Arity::SystemData => EntityKind::System,
            Arity::Connection | Arity::ConnectionData => EntityKind::Connection,
        }
    }

    pub fn has_data(self) -> bool {
        matches!(self, Arity::SystemData | Arity::ConnectionData)
    }

    /// Relation type used in the result-shape declaration.
    pub fn type_expr(self) -> &'static str {
        match self {
            Arity::System => "System",
            Arity::Connection => "Connection",
            Arity::SystemData => "System -> Data",
            Arity::ConnectionData => "Connection -> Data",
        }
    }

    /// Minimum decoded tuple length, counting the result-shape anchor at
    /// position 0.
    pub fn tuple_len(self) -> usize {
        if self.has_data() {
            3
        } else {
            2
        }
    }
}

/// Which evaluator owns a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Engine {
    Solver,
    FastPath,
}

/// A catalogued rule. Ordering follows catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleKey {
    StorageViolations,
    FlowViolations,
    LocationViolations,
    BypassViolations,
    UnencryptedChannels,
    AuthIntegrityGaps,
    ContentControlFailures,
    UnencryptedStorage,
    AdminAccessViolation,
    MalwareInspectionGaps,
    UnmanagedMobileAccess,
    WirelessExposure,
    UnisolatedInternetAccess,
    UnpatchedExposure,
    Eol,
    AuditFailure,
    TimeSyncFailure,
    WeakSession,
    ShadowIt,
}

struct RuleInfo {
    key: &'static str,
    function: &'static str,
    arity: Arity,
    engine: Engine,
    remediation: &'static str,
}

const CATALOG: [RuleInfo; 19] = [
    RuleInfo {
        key: "FindStorageViolations",
        function: "detectStorageViolations",
        arity: Arity::SystemData,
        engine: Engine::Solver,
        remediation: "Raise the system's security grade, or move the data to a system of sufficient grade.",
    },
    RuleInfo {
        key: "FindFlowViolations",
        function: "detectFlowViolations",
        arity: Arity::ConnectionData,
        engine: Engine::Solver,
        remediation: "Place a CDS on this path, or apply network isolation (VDI/RBI) at the source.",
    },
    RuleInfo {
        key: "FindLocationViolations",
        function: "detectLocationViolations",
        arity: Arity::System,
        engine: Engine::Solver,
        remediation: "Move the system into a zone of matching security grade.",
    },
    RuleInfo {
        key: "FindBypassViolations",
        function: "detectBypassViolations",
        arity: Arity::Connection,
        engine: Engine::Solver,
        remediation: "Remove the direct link from the Internet zone to the internal network and route it through a CDS.",
    },
    RuleInfo {
        key: "FindUnencryptedChannels",
        function: "detectUnencryptedChannels",
        arity: Arity::Connection,
        engine: Engine::Solver,
        remediation: "Switch this link to an encrypted protocol (HTTPS, SSH, VPN).",
    },
    RuleInfo {
        key: "FindAuthIntegrityGaps",
        function: "detectAuthIntegrityGaps",
        arity: Arity::System,
        engine: Engine::Solver,
        remediation: "Enable multi-factor authentication (MFA) and register the system in the asset inventory.",
    },
    RuleInfo {
        key: "FindContentControlFailures",
        function: "detectContentControlFailures",
        arity: Arity::ConnectionData,
        engine: Engine::Solver,
        remediation: "Apply CDR (content disarm and reconstruction) to files and DLP to sensitive data crossing zones.",
    },
    RuleInfo {
        key: "FindUnencryptedStorage",
        function: "detectUnencryptedStorage",
        arity: Arity::SystemData,
        engine: Engine::Solver,
        remediation: "Encrypt sensitive data at rest (database or full-disk encryption).",
    },
    RuleInfo {
        key: "FindAdminAccessViolation",
        function: "detectAdminAccessViolation",
        arity: Arity::Connection,
        engine: Engine::Solver,
        remediation: "Administrative interfaces must only be reached from dedicated management devices.",
    },
    RuleInfo {
        key: "FindMalwareInspectionGaps",
        function: "detectMalwareInspectionGaps",
        arity: Arity::ConnectionData,
        engine: Engine::Solver,
        remediation: "Inspect executable content with anti-malware before it is transferred.",
    },
    RuleInfo {
        key: "FindUnmanagedMobileAccess",
        function: "detectUnmanagedMobileAccess",
        arity: Arity::Connection,
        engine: Engine::Solver,
        remediation: "Enroll the mobile device in MDM before granting access to non-public systems.",
    },
    RuleInfo {
        key: "FindWirelessExposure",
        function: "detectWirelessExposure",
        arity: Arity::System,
        engine: Engine::Solver,
        remediation: "Move classified systems off wireless segments onto a wired, isolated zone.",
    },
    RuleInfo {
        key: "FindUnisolatedInternetAccess",
        function: "detectUnisolatedInternetAccess",
        arity: Arity::Connection,
        engine: Engine::Solver,
        remediation: "Reach the Internet from sensitive systems only through VDI/RBI isolation or a CDS.",
    },
    RuleInfo {
        key: "FindUnpatchedExposure",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-IN-1] Unpatched exposure: a vulnerable system sits at an external boundary. Apply security patches.",
    },
    RuleInfo {
        key: "FindEOL",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-IN-9] End-of-life asset: an unsupported (EOL) asset is used as a sensitive system. Replace or upgrade it.",
    },
    RuleInfo {
        key: "FindAuditFailure",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-Log] Missing audit log: audit logging is disabled on a sensitive system.",
    },
    RuleInfo {
        key: "FindTimeSyncFailure",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-Log] Missing time sync: trustworthy logs need a secure time source (NTP).",
    },
    RuleInfo {
        key: "FindWeakSession",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-SN-3] Weak session control: enforce session timeouts and concurrent login limits.",
    },
    RuleInfo {
        key: "FindShadowIT",
        function: "",
        arity: Arity::System,
        engine: Engine::FastPath,
        remediation: "[N2SF-DV-M1] Unregistered asset: a system missing from the security asset inventory is connected.",
    },
];

impl RuleKey {
    pub const ALL: [RuleKey; 19] = [
        RuleKey::StorageViolations,
        RuleKey::FlowViolations,
        RuleKey::LocationViolations,
        RuleKey::BypassViolations,
        RuleKey::UnencryptedChannels,
        RuleKey::AuthIntegrityGaps,
        RuleKey::ContentControlFailures,
        RuleKey::UnencryptedStorage,
        RuleKey::AdminAccessViolation,
        RuleKey::MalwareInspectionGaps,
        RuleKey::UnmanagedMobileAccess,
        RuleKey::WirelessExposure,
        RuleKey::UnisolatedInternetAccess,
        RuleKey::UnpatchedExposure,
        RuleKey::Eol,
        RuleKey::AuditFailure,
        RuleKey::TimeSyncFailure,
        RuleKey::WeakSession,
        RuleKey::ShadowIt,
    ];

    fn info(self) -> &'static RuleInfo {
        &CATALOG[self as usize]
    }

    /// Field label in the result shape and key in reports.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn arity(self) -> Arity {
        self.info().arity
    }

    pub fn engine(self) -> Engine {
        self.info().engine
    }

    pub fn remediation(self) -> &'static str {
        self.info().remediation
    }

    /// Name of the base-model function computing this rule. Fast-path
    /// rules have none.
    pub fn solver_fn(self) -> Option<&'static str> {
        match self.info().engine {
            Engine::Solver => Some(self.info().function),
            Engine::FastPath => None,
        }
    }

    pub fn from_key(key: &str) -> Option<RuleKey> {
        RuleKey::ALL.iter().copied().find(|r| r.key() == key)
    }

    /// Rules evaluated by the external engine, in catalog order.
    pub fn solver_rules() -> impl Iterator<Item = RuleKey> {
        RuleKey::ALL
            .into_iter()
            .filter(|r| r.engine() == Engine::Solver)
    }

    /// Rules evaluated in-process, in catalog order.
    pub fn fast_path_rules() -> impl Iterator<Item = RuleKey> {
        RuleKey::ALL
            .into_iter()
            .filter(|r| r.engine() == Engine::FastPath)
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for RuleKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_table_matches_variant_order() {
        for (i, rule) in RuleKey::ALL.iter().enumerate() {
            assert_eq!(*rule as usize, i);
            assert_eq!(RuleKey::from_key(rule.key()), Some(*rule));
        }
    }

    #[test]
    fn keys_are_unique_and_prefixed() {
        let keys: BTreeSet<&str> = RuleKey::ALL.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), RuleKey::ALL.len());
        assert!(keys.iter().all(|k| k.starts_with("Find")));
    }

    #[test]
    fn solver_and_fast_path_are_disjoint() {
        let solver: BTreeSet<RuleKey> = RuleKey::solver_rules().collect();
        let fast: BTreeSet<RuleKey> = RuleKey::fast_path_rules().collect();
        assert_eq!(solver.len(), 13);
        assert_eq!(fast.len(), 6);
        assert!(solver.is_disjoint(&fast));
    }

    #[test]
    fn solver_rules_have_functions() {
        for rule in RuleKey::solver_rules() {
            let f = rule.solver_fn().unwrap();
            assert_eq!(f.strip_prefix("detect"), rule.key().strip_prefix("Find"));
        }
        assert!(RuleKey::fast_path_rules().all(|r| r.solver_fn().is_none()));
    }

    #[test]
    fn fast_path_rules_are_single_system() {
        assert!(RuleKey::fast_path_rules().all(|r| r.arity() == Arity::System));
    }

    #[test]
    fn arity_shapes() {
        assert_eq!(RuleKey::AdminAccessViolation.arity(), Arity::Connection);
        assert_eq!(RuleKey::FlowViolations.arity(), Arity::ConnectionData);
        assert_eq!(Arity::SystemData.type_expr(), "System -> Data");
        assert_eq!(Arity::SystemData.tuple_len(), 3);
        assert_eq!(Arity::Connection.tuple_len(), 2);
        assert_eq!(Arity::ConnectionData.subject(), EntityKind::Connection);
    }

    #[test]
    fn unknown_key() {
        assert_eq!(RuleKey::from_key("FindNothing"), None);
    }
}
