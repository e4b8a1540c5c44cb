//! Causality facts
//!
//! A `Fact` is an immutable, value-identified node of the causality graph:
//! an event or entity such as "method M is reachable". Facts use structural
//! equality, so repeated construction of the same event deduplicates safely
//! in the concurrent edge sets.
//!
//! Root facts may exist without an incoming cause. Whether a fact is
//! `essential` (must survive pruning) or `unused` (its element was eliminated
//! by a later phase and must vanish from the graph) is a collaborator
//! judgment answered by the `AnalysisUniverse` port, not by the fact itself.

use super::ids::{MethodId, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a causality fact, with a stable export ordinal
///
/// The binary export encodes one byte per fact, so the universe of kinds is
/// capped at 256; the exporter fails rather than truncating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FactKind {
    MethodReachable = 0,
    MethodImplementationInvoked = 1,
    VirtualMethodInvoked = 2,
    TypeReachable = 3,
    TypeInstantiated = 4,
    UnknownHeapObject = 5,
    RootRegistration = 6,
    ConfigurationRegistration = 7,
    BuildTimeClassInitializer = 8,
    InitialRegistration = 9,
}

impl FactKind {
    /// All kinds in ordinal order, for `kinds.txt`
    pub const ALL: [FactKind; 10] = [
        FactKind::MethodReachable,
        FactKind::MethodImplementationInvoked,
        FactKind::VirtualMethodInvoked,
        FactKind::TypeReachable,
        FactKind::TypeInstantiated,
        FactKind::UnknownHeapObject,
        FactKind::RootRegistration,
        FactKind::ConfigurationRegistration,
        FactKind::BuildTimeClassInitializer,
        FactKind::InitialRegistration,
    ];

    /// Stable export ordinal
    #[inline]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Kind name as written to `kinds.txt`
    pub fn name(self) -> &'static str {
        match self {
            FactKind::MethodReachable => "MethodReachable",
            FactKind::MethodImplementationInvoked => "MethodImplementationInvoked",
            FactKind::VirtualMethodInvoked => "VirtualMethodInvoked",
            FactKind::TypeReachable => "TypeReachable",
            FactKind::TypeInstantiated => "TypeInstantiated",
            FactKind::UnknownHeapObject => "UnknownHeapObject",
            FactKind::RootRegistration => "RootRegistration",
            FactKind::ConfigurationRegistration => "ConfigurationRegistration",
            FactKind::BuildTimeClassInitializer => "BuildTimeClassInitializer",
            FactKind::InitialRegistration => "InitialRegistration",
        }
    }
}

/// A causality-graph node
///
/// The derived `Ord` gives facts a total order independent of display names;
/// hyperedges use it to normalize their unordered cause pair.
///
/// Only `Serialize` is derived: the registration names are `&'static str`
/// borrows that cannot come out of a deserializer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Fact {
    /// Method became reachable
    MethodReachable(MethodId),

    /// A concrete implementation was invoked through a resolved call
    MethodImplementationInvoked(MethodId),

    /// A virtual call site with this invocation target was exercised
    VirtualMethodInvoked(MethodId),

    /// Type became reachable
    TypeReachable(TypeId),

    /// Type was instantiated
    TypeInstantiated(TypeId),

    /// Sentinel for a heap object of the given class with no recorded
    /// provenance; root
    UnknownHeapObject(TypeId),

    /// Named analysis entry point (e.g. a main-entry or feature hook); root
    RootRegistration(&'static str),

    /// Registration coming from an external configuration source
    /// (reflection/JNI-style config); root
    ConfigurationRegistration(&'static str),

    /// Class initializer executed at build time; root
    BuildTimeClassInitializer(TypeId),

    /// The anonymous true root; also exempt from context-stack rerooting
    /// checks
    InitialRegistration,
}

impl Fact {
    /// Kind of this fact
    pub fn kind(&self) -> FactKind {
        match self {
            Fact::MethodReachable(_) => FactKind::MethodReachable,
            Fact::MethodImplementationInvoked(_) => FactKind::MethodImplementationInvoked,
            Fact::VirtualMethodInvoked(_) => FactKind::VirtualMethodInvoked,
            Fact::TypeReachable(_) => FactKind::TypeReachable,
            Fact::TypeInstantiated(_) => FactKind::TypeInstantiated,
            Fact::UnknownHeapObject(_) => FactKind::UnknownHeapObject,
            Fact::RootRegistration(_) => FactKind::RootRegistration,
            Fact::ConfigurationRegistration(_) => FactKind::ConfigurationRegistration,
            Fact::BuildTimeClassInitializer(_) => FactKind::BuildTimeClassInitializer,
            Fact::InitialRegistration => FactKind::InitialRegistration,
        }
    }

    /// May this fact exist with no incoming edge?
    #[inline]
    pub fn is_root(&self) -> bool {
        matches!(
            self,
            Fact::UnknownHeapObject(_)
                | Fact::RootRegistration(_)
                | Fact::ConfigurationRegistration(_)
                | Fact::BuildTimeClassInitializer(_)
                | Fact::InitialRegistration
        )
    }

    /// Exempt from the context-stack rerooting check
    #[inline]
    pub fn is_reroot_exempt(&self) -> bool {
        matches!(self, Fact::InitialRegistration)
    }

    /// The method this fact is about, if any
    pub fn method(&self) -> Option<MethodId> {
        match self {
            Fact::MethodReachable(m)
            | Fact::MethodImplementationInvoked(m)
            | Fact::VirtualMethodInvoked(m) => Some(*m),
            _ => None,
        }
    }

    /// The type this fact is about, if any
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Fact::TypeReachable(t)
            | Fact::TypeInstantiated(t)
            | Fact::UnknownHeapObject(t)
            | Fact::BuildTimeClassInitializer(t) => Some(*t),
            _ => None,
        }
    }
}

/// Compact name-free rendering, distinct per fact
///
/// Synthetic flow-node labels embed this; the resolved display names live on
/// the `AnalysisUniverse` port and are only available at export.
impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::MethodReachable(m) => write!(f, "reachable {}", m),
            Fact::MethodImplementationInvoked(m) => write!(f, "implementation {}", m),
            Fact::VirtualMethodInvoked(m) => write!(f, "virtual invoke {}", m),
            Fact::TypeReachable(t) => write!(f, "reachable {}", t),
            Fact::TypeInstantiated(t) => write!(f, "instantiated {}", t),
            Fact::UnknownHeapObject(t) => write!(f, "unknown heap object {}", t),
            Fact::RootRegistration(name) => write!(f, "root {}", name),
            Fact::ConfigurationRegistration(name) => write!(f, "configuration {}", name),
            Fact::BuildTimeClassInitializer(t) => write!(f, "build-time initializer {}", t),
            Fact::InitialRegistration => write!(f, "initial registrations"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_predicate() {
        assert!(Fact::RootRegistration("main").is_root());
        assert!(Fact::UnknownHeapObject(TypeId(3)).is_root());
        assert!(Fact::InitialRegistration.is_root());
        assert!(!Fact::MethodReachable(MethodId(1)).is_root());
        assert!(!Fact::TypeInstantiated(TypeId(1)).is_root());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(
            Fact::MethodReachable(MethodId(7)),
            Fact::MethodReachable(MethodId(7))
        );
        assert_ne!(
            Fact::MethodReachable(MethodId(7)),
            Fact::MethodImplementationInvoked(MethodId(7))
        );
    }

    #[test]
    fn test_kind_ordinals_are_stable() {
        for (i, kind) in FactKind::ALL.iter().enumerate() {
            assert_eq!(kind.ordinal() as usize, i);
        }
    }

    #[test]
    fn test_display_is_distinct_per_fact() {
        let facts = [
            Fact::MethodReachable(MethodId(1)),
            Fact::MethodImplementationInvoked(MethodId(1)),
            Fact::TypeReachable(TypeId(1)),
            Fact::UnknownHeapObject(TypeId(1)),
            Fact::RootRegistration("main"),
        ];
        for a in &facts {
            for b in &facts {
                if a != b {
                    assert_ne!(a.to_string(), b.to_string());
                }
            }
        }
    }

    #[test]
    fn test_only_initial_registration_is_exempt() {
        assert!(Fact::InitialRegistration.is_reroot_exempt());
        assert!(!Fact::RootRegistration("main").is_reroot_exempt());
    }
}
