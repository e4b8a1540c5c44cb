//! Concurrent edge recorder
//!
//! Presence-only deduplicated sets shared by every analysis worker thread.
//! All recording entry points are O(1) amortized inserts that never take a
//! global lock; the sets are write-only during analysis and drained exactly
//! once, single-threaded, at export time.

use super::context::{self, CauseScope};
use super::super::domain::{CauseToken, DirectEdge, HyperEdge};
use crate::shared::models::{Fact, FlowId, TypeId, TypeIdSet};
use dashmap::{DashMap, DashSet};

/// Directed edge between typeflow nodes; `from == None` is the
/// always-satisfied entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowEdge {
    pub from: Option<FlowId>,
    pub to: FlowId,
}

/// Everything the recorder accumulated over a run, moved out in one shot
#[derive(Debug, Default)]
pub struct RecordedStores {
    pub direct: Vec<DirectEdge>,
    pub hyper: Vec<HyperEdge>,
    pub flow_edges: Vec<FlowEdge>,
    pub heap_flows: Vec<((Fact, FlowId), TypeIdSet)>,
}

/// Concurrent, deduplicated edge store plus the causal-context surface
#[derive(Debug, Default)]
pub struct EdgeRecorder {
    direct: DashSet<DirectEdge>,
    hyper: DashSet<HyperEdge>,
    flow_edges: DashSet<FlowEdge>,
    /// Types a heap-origin cause delivered into a destination flow; the same
    /// cause can deliver many distinct types to the same flow over the run
    heap_flows: DashMap<(Fact, FlowId), TypeIdSet>,
}

impl EdgeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cause -> consequence`
    ///
    /// A `None` or root cause resolves to the calling thread's current
    /// context cause, captured here and never re-resolved; with no context
    /// it stays `None`, a true root edge. Self-loops are rejected. Returns
    /// whether the set changed.
    pub fn register_edge(&self, cause: Option<Fact>, consequence: Fact) -> bool {
        let resolved = match cause {
            Some(c) if !c.is_root() => Some(c),
            _ => context::current_cause(),
        };
        self.insert_direct(resolved, consequence)
    }

    fn insert_direct(&self, cause: Option<Fact>, consequence: Fact) -> bool {
        if cause.as_ref() == Some(&consequence) {
            return false;
        }
        self.direct.insert(DirectEdge::new(cause, consequence))
    }

    /// Register `{c1, c2} -> consequence`; both causes are required
    ///
    /// A `None` cause degrades the call to `register_edge` from the
    /// remaining cause, so a root cause re-attributes through the context
    /// exactly as a plain registration would; equal causes degrade the same
    /// way. A cause equal to the consequence is a programming error and
    /// aborts.
    pub fn register_conjunctive_edge(
        &self,
        c1: Option<Fact>,
        c2: Option<Fact>,
        consequence: Fact,
    ) -> bool {
        match (c1, c2) {
            (None, None) => self.register_edge(None, consequence),
            (Some(c), None) | (None, Some(c)) => self.register_edge(Some(c), consequence),
            (Some(a), Some(b)) if a == b => self.register_edge(Some(a), consequence),
            (Some(a), Some(b)) => {
                assert!(
                    a != consequence && b != consequence,
                    "malformed hyperedge: cause equals consequence {:?}",
                    consequence
                );
                self.hyper.insert(HyperEdge::new(a, b, consequence))
            }
        }
    }

    /// Record a typeflow edge; `None` source is the always-satisfied entry
    pub fn register_flow_edge(&self, from: Option<FlowId>, to: FlowId) -> bool {
        if from == Some(to) {
            return false;
        }
        self.flow_edges.insert(FlowEdge { from, to })
    }

    /// Record that `ty` entered `dest` because it flowed out of the heap,
    /// attributed to `cause`
    pub fn register_heap_flow(&self, cause: Fact, dest: FlowId, ty: TypeId) -> bool {
        self.heap_flows.entry((cause, dest)).or_default().insert(ty)
    }

    // ── Causal context surface ──────────────────────────────────────────

    /// Current active cause of the calling thread
    pub fn current_cause(&self) -> Option<Fact> {
        context::current_cause()
    }

    /// Push `fact` as the active cause after recording `top -> fact`
    ///
    /// The returned scope must live for the whole processing of `fact`; it
    /// restores the parent scope on drop, on every exit path.
    #[track_caller]
    pub fn push_cause(&self, fact: Fact) -> CauseScope {
        self.push_cause_inner(fact, false)
    }

    /// Like `push_cause`, but explicitly permitted to replace a live
    /// non-root scope
    #[track_caller]
    pub fn push_cause_rerooting(&self, fact: Fact) -> CauseScope {
        self.push_cause_inner(fact, true)
    }

    #[track_caller]
    fn push_cause_inner(&self, fact: Fact, permit_reroot: bool) -> CauseScope {
        self.register_edge(None, fact.clone());
        let restore_len = context::push_token(CauseToken::new(fact), permit_reroot);
        CauseScope::new(restore_len)
    }

    /// Install `fact` as the sole active cause of the calling thread
    /// (task-boundary, non-scoped variant of `push_cause`)
    #[track_caller]
    pub fn set_cause(&self, fact: Fact) {
        context::clear();
        self.register_edge(None, fact.clone());
        let _ = context::push_token(CauseToken::new(fact), true);
    }

    /// Drop every context frame on the calling thread
    pub fn reset_cause(&self) {
        context::clear();
    }

    // ── Export-time drain ───────────────────────────────────────────────

    /// Move all accumulated stores out, leaving the recorder empty
    ///
    /// Single-shot: callers guarantee analysis quiescence first, or risk
    /// lost or torn reads.
    pub fn drain(&self) -> RecordedStores {
        let direct: Vec<_> = self.direct.iter().map(|e| e.key().clone()).collect();
        self.direct.clear();
        let hyper: Vec<_> = self.hyper.iter().map(|e| e.key().clone()).collect();
        self.hyper.clear();
        let flow_edges: Vec<_> = self.flow_edges.iter().map(|e| e.key().clone()).collect();
        self.flow_edges.clear();
        let heap_flows: Vec<_> = self
            .heap_flows
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        self.heap_flows.clear();
        RecordedStores {
            direct,
            hyper,
            flow_edges,
            heap_flows,
        }
    }

    /// Number of distinct direct edges currently recorded
    pub fn direct_len(&self) -> usize {
        self.direct.len()
    }

    /// Number of distinct hyperedges currently recorded
    pub fn hyper_len(&self) -> usize {
        self.hyper.len()
    }
}
