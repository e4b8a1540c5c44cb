//! Edge-store domain types
//!
//! Direct edges carry one cause, hyperedges require two. Both are value
//! objects: concurrent duplicate registrations collapse in the presence-only
//! sets without extra synchronization.

use crate::shared::models::Fact;
use serde::Serialize;
use std::panic::Location;

/// Single-cause dependency: `cause` explains `consequence`
///
/// `cause == None` is a true root edge. The null case participates in
/// equality, so a root edge and a caused edge to the same consequence are
/// distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DirectEdge {
    pub cause: Option<Fact>,
    pub consequence: Fact,
}

impl DirectEdge {
    pub fn new(cause: Option<Fact>, consequence: Fact) -> Self {
        Self { cause, consequence }
    }

    /// True root edge: no incoming cause
    #[inline]
    pub fn is_root_edge(&self) -> bool {
        self.cause.is_none()
    }
}

/// Two-cause dependency: the consequence needs both causes
///
/// The cause pair is unordered; the constructor normalizes it so equality
/// and hashing are order-independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HyperEdge {
    causes: [Fact; 2],
    pub consequence: Fact,
}

impl HyperEdge {
    /// Build a normalized hyperedge
    ///
    /// Panics if a cause equals the consequence or the causes coincide;
    /// callers degrade those inputs to direct edges before getting here.
    pub fn new(c1: Fact, c2: Fact, consequence: Fact) -> Self {
        assert!(
            c1 != consequence && c2 != consequence,
            "hyperedge cause equals its consequence: {:?}",
            consequence
        );
        assert!(c1 != c2, "hyperedge with coinciding causes: {:?}", c1);
        let causes = if c1 <= c2 { [c1, c2] } else { [c2, c1] };
        Self { causes, consequence }
    }

    #[inline]
    pub fn causes(&self) -> &[Fact; 2] {
        &self.causes
    }
}

/// One frame of the causal context stack
///
/// Carries the call site that pushed it, for the diagnostic message when a
/// nested scope is left unreleased.
#[derive(Debug, Clone)]
pub struct CauseToken {
    pub fact: Fact,
    pub registered_at: &'static Location<'static>,
}

impl CauseToken {
    #[track_caller]
    pub fn new(fact: Fact) -> Self {
        Self {
            fact,
            registered_at: Location::caller(),
        }
    }
}
