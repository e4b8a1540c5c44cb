//! Typeflow domain types (fine mode)
//!
//! A `FlowNode` either wraps a live analysis typeflow (identity = its
//! `FlowId`) or is synthesized by the engine: the per-invocation receiver
//! accumulator, the per-type "reached" pseudo-node, or the heap-origin
//! pseudo-node. Facts use value equality; flow nodes wrapping a live flow
//! deliberately compare by id.

use crate::shared::models::{Fact, FlowId, MethodId, TypeId, TypeState};
use rustc_hash::FxHashMap;

/// Kind of a live analysis typeflow, as reported by the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// Allocation source
    Allocation,
    /// Type filter
    Filter,
    /// Null check
    NullCheck,
    /// Constant source
    Constant,
    FieldLoad,
    FieldStore,
    /// Receiver of a virtual invocation
    Receiver,
    /// The global all-instantiated flow
    AllInstantiated,
    Other,
}

/// One frame of a flow's source-position chain, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub method: MethodId,
    /// Synthetic unwind frames carry no attribution value and are chopped
    pub synthetic_unwind: bool,
}

impl Frame {
    pub fn real(method: MethodId) -> Self {
        Self {
            method,
            synthetic_unwind: false,
        }
    }

    pub fn unwind(method: MethodId) -> Self {
        Self {
            method,
            synthetic_unwind: true,
        }
    }
}

/// Metadata of a live typeflow, registered by the analysis in fine mode
#[derive(Debug, Clone)]
pub struct FlowDescriptor {
    pub id: FlowId,
    pub label: String,
    pub kind: FlowKind,
    /// Type-state filter of the flow at quiescence
    pub filter: TypeState,
    /// Source-position frame chain, outermost first
    pub frames: Vec<Frame>,
    /// Attribution fallback when no real frame survives the heuristics
    pub method_hint: Option<MethodId>,
    /// Invoked method, for receiver flows
    pub invoked_method: Option<MethodId>,
}

impl FlowDescriptor {
    pub fn new(id: FlowId, label: impl Into<String>, kind: FlowKind) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
            filter: TypeState::Empty,
            frames: Vec::new(),
            method_hint: None,
            invoked_method: None,
        }
    }

    pub fn with_filter(mut self, filter: TypeState) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_method_hint(mut self, method: MethodId) -> Self {
        self.method_hint = Some(method);
        self
    }

    pub fn with_invoked_method(mut self, method: MethodId) -> Self {
        self.invoked_method = Some(method);
        self
    }

    #[inline]
    pub fn is_all_instantiated(&self) -> bool {
        self.kind == FlowKind::AllInstantiated
    }
}

/// Node of the exported typeflow subgraph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowNode {
    /// Live analysis typeflow
    Real(FlowId),
    /// Receiver accumulator of a virtual invocation
    VirtualReceiver(MethodId),
    /// Per-type "reached" pseudo-node
    TypeReached(TypeId),
    /// Heap-origin pseudo-node, one per heap-flow cause
    HeapOrigin(Fact),
}

impl FlowNode {
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, FlowNode::Real(_))
    }
}

/// Dense index into the flow-node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowNodeIdx(pub u32);

/// Record of one surviving subgraph node
#[derive(Debug, Clone)]
pub struct FlowNodeRecord {
    pub node: FlowNode,
    pub label: String,
    pub filter: TypeState,
    /// Fact this flow is associated with
    pub containing: Option<Fact>,
    /// Flipped association: the flow makes its containing fact reachable
    /// instead of being gated by it (call-receiver flows)
    pub makes_containing_reachable: bool,
}

/// Interning arena for subgraph nodes
#[derive(Debug, Default)]
pub struct FlowNodeArena {
    records: Vec<FlowNodeRecord>,
    index: FxHashMap<FlowNode, FlowNodeIdx>,
}

impl FlowNodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a node, creating its record on first sight
    pub fn intern(&mut self, node: FlowNode, make_record: impl FnOnce() -> FlowNodeRecord) -> FlowNodeIdx {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = FlowNodeIdx(self.records.len() as u32);
        self.records.push(make_record());
        self.index.insert(node, idx);
        idx
    }

    pub fn lookup(&self, node: &FlowNode) -> Option<FlowNodeIdx> {
        self.index.get(node).copied()
    }

    pub fn record(&self, idx: FlowNodeIdx) -> &FlowNodeRecord {
        &self.records[idx.0 as usize]
    }

    pub fn record_mut(&mut self, idx: FlowNodeIdx) -> &mut FlowNodeRecord {
        &mut self.records[idx.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlowNodeIdx, &FlowNodeRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (FlowNodeIdx(i as u32), r))
    }

    pub fn into_records(self) -> Vec<FlowNodeRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_interns_by_identity() {
        let mut arena = FlowNodeArena::new();
        let a = arena.intern(FlowNode::Real(FlowId(1)), || FlowNodeRecord {
            node: FlowNode::Real(FlowId(1)),
            label: "a".into(),
            filter: TypeState::Empty,
            containing: None,
            makes_containing_reachable: false,
        });
        let b = arena.intern(FlowNode::Real(FlowId(1)), || unreachable!());
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_synthetic_nodes_are_distinct() {
        assert_ne!(
            FlowNode::TypeReached(TypeId(1)),
            FlowNode::VirtualReceiver(MethodId(1))
        );
        assert!(FlowNode::TypeReached(TypeId(1)).is_synthetic());
        assert!(!FlowNode::Real(FlowId(1)).is_synthetic());
    }
}
