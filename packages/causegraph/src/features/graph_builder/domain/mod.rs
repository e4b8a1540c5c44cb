//! Finalized provenance graph
//!
//! Dense, index-based form produced by the builder and consumed by the
//! exporter. Index 0 is a valid fact/flow position here; the exporter's
//! "0 = root / entry" convention comes from its own 1-based renumbering.

use crate::shared::models::{Fact, TypeState};

/// One surviving typeflow node, finalized
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub label: String,
    pub filter: TypeState,
    /// Index into `ProvenanceGraph::facts`
    pub containing: Option<u32>,
    /// Flipped association: the flow makes its containing fact reachable
    pub makes_containing_reachable: bool,
}

/// The pruned graph, ready for export
#[derive(Debug, Default)]
pub struct ProvenanceGraph {
    pub facts: Vec<Fact>,
    pub flows: Vec<FlowRecord>,
    /// `(cause, consequence)` fact indices; `None` cause = true root
    pub direct: Vec<(Option<u32>, u32)>,
    /// `(cause1, cause2, consequence)` fact indices
    pub hyper: Vec<(u32, u32, u32)>,
    /// `(from, to)` flow indices; `None` from = always-satisfied entry
    pub flow_edges: Vec<(Option<u32>, u32)>,
}

impl ProvenanceGraph {
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.flows.is_empty()
    }
}
