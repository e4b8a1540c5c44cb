//! Typeflow subgraph construction (fine mode)
//!
//! Maps the recorded flow edges into an arena-indexed subgraph: flows whose
//! type-state filter carries no causal information are dropped, surviving
//! flows are attached to a containing fact inferred from their frame chain,
//! and the synthetic receiver / type-reached / heap-origin nodes are woven
//! in.

use super::super::domain::{
    FlowDescriptor, FlowKind, FlowNode, FlowNodeArena, FlowNodeIdx, FlowNodeRecord,
};
use crate::features::edge_store::FlowEdge;
use crate::shared::models::{Fact, FlowId, MethodId, TypeId, TypeIdSet, TypeState};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Arena-indexed adjacency view of the typeflow subgraph
#[derive(Debug, Default)]
pub struct FlowSubgraph {
    pub arena: FlowNodeArena,
    pub fwd: Vec<FxHashSet<u32>>,
    pub rev: Vec<FxHashSet<u32>>,
    /// Always-satisfied entry marker per node
    pub entry: Vec<bool>,
    pub removed: Vec<bool>,
}

impl FlowSubgraph {
    fn ensure(&mut self, idx: FlowNodeIdx) {
        let needed = idx.0 as usize + 1;
        if self.fwd.len() < needed {
            self.fwd.resize_with(needed, FxHashSet::default);
            self.rev.resize_with(needed, FxHashSet::default);
            self.entry.resize(needed, false);
            self.removed.resize(needed, false);
        }
    }

    fn intern(&mut self, node: FlowNode, make_record: impl FnOnce() -> FlowNodeRecord) -> FlowNodeIdx {
        let idx = self.arena.intern(node, make_record);
        self.ensure(idx);
        idx
    }

    pub fn add_edge(&mut self, from: FlowNodeIdx, to: FlowNodeIdx) {
        if from == to {
            return;
        }
        self.fwd[from.0 as usize].insert(to.0);
        self.rev[to.0 as usize].insert(from.0);
    }

    pub fn mark_entry(&mut self, idx: FlowNodeIdx) {
        self.entry[idx.0 as usize] = true;
    }

    /// Alive nodes
    pub fn live_count(&self) -> usize {
        self.removed.iter().filter(|r| !**r).count()
    }
}

/// Infer the containing method of a flow from its frame chain
///
/// Black-box attribution heuristic compensating for imprecise upstream
/// position metadata, validated against fixtures: trailing synthetic unwind
/// frames are chopped; filter and null-check flows bias toward the outermost
/// surviving real frame, constant flows toward the innermost; every other
/// kind takes the innermost. Falls back to the descriptor's method hint.
pub fn attribute_containing_method(desc: &FlowDescriptor) -> Option<MethodId> {
    let mut frames = desc.frames.as_slice();
    while let Some(last) = frames.last() {
        if last.synthetic_unwind {
            frames = &frames[..frames.len() - 1];
        } else {
            break;
        }
    }
    let mut real = frames.iter().filter(|f| !f.synthetic_unwind);
    let picked = match desc.kind {
        FlowKind::Filter | FlowKind::NullCheck => real.next(),
        FlowKind::Constant => real.last(),
        _ => real.last(),
    };
    picked.map(|f| f.method).or(desc.method_hint)
}

/// Build the subgraph from the drained fine-mode stores
pub fn build_subgraph(
    descriptors: &FxHashMap<FlowId, FlowDescriptor>,
    flow_edges: &[FlowEdge],
    heap_flows: &[((Fact, FlowId), TypeIdSet)],
) -> FlowSubgraph {
    let mut graph = FlowSubgraph::default();
    let mut memo: FxHashMap<FlowId, Option<FlowNodeIdx>> = FxHashMap::default();

    // Memoizing endpoint mapper: drops flows with no causal information.
    let mut map_flow = |graph: &mut FlowSubgraph, id: FlowId| -> Option<FlowNodeIdx> {
        if let Some(mapped) = memo.get(&id) {
            return *mapped;
        }
        let mapped = descriptors.get(&id).and_then(|desc| {
            if desc.filter.is_empty_primitive() {
                return None;
            }
            let containing_method = attribute_containing_method(desc);
            let record = FlowNodeRecord {
                node: FlowNode::Real(id),
                label: desc.label.clone(),
                filter: desc.filter.clone(),
                containing: containing_method.map(Fact::MethodReachable),
                makes_containing_reachable: false,
            };
            let idx = graph.intern(FlowNode::Real(id), || record);

            match desc.kind {
                // Receiver flows feed the per-invocation accumulator, which
                // is what makes the invocation fact reachable.
                FlowKind::Receiver => {
                    if let Some(invoked) = desc.invoked_method {
                        let receiver = graph.intern(
                            FlowNode::VirtualReceiver(invoked),
                            || FlowNodeRecord {
                                node: FlowNode::VirtualReceiver(invoked),
                                label: format!("receiver of {}", invoked),
                                filter: TypeState::Empty,
                                containing: Some(Fact::VirtualMethodInvoked(invoked)),
                                makes_containing_reachable: true,
                            },
                        );
                        let merged = graph.arena.record(receiver).filter.union(&desc.filter);
                        graph.arena.record_mut(receiver).filter = merged;
                        graph.add_edge(idx, receiver);
                    }
                }
                // Allocation sources are gated by the instantiation of each
                // type they can produce.
                FlowKind::Allocation => {
                    if let TypeState::Types(types) = &desc.filter {
                        for ty in types.iter() {
                            let reached = intern_type_reached(graph, ty);
                            graph.add_edge(reached, idx);
                        }
                    }
                }
                _ => {}
            }
            Some(idx)
        });
        memo.insert(id, mapped);
        mapped
    };

    for edge in flow_edges {
        let Some(to) = map_flow(&mut graph, edge.to) else {
            continue;
        };
        match edge.from {
            None => graph.mark_entry(to),
            Some(from) => {
                if let Some(from) = map_flow(&mut graph, from) {
                    graph.add_edge(from, to);
                }
            }
        }
    }

    for ((cause, dest), types) in heap_flows {
        let Some(dest) = map_flow(&mut graph, *dest) else {
            continue;
        };
        // The label must be unique per cause: export ordering sorts by label
        // and must not depend on registration order.
        let origin = graph.intern(FlowNode::HeapOrigin(cause.clone()), || FlowNodeRecord {
            node: FlowNode::HeapOrigin(cause.clone()),
            label: format!("heap origin: {}", cause),
            filter: TypeState::Empty,
            containing: Some(cause.clone()),
            makes_containing_reachable: false,
        });
        let merged = graph
            .arena
            .record(origin)
            .filter
            .union(&TypeState::Types(types.clone()));
        graph.arena.record_mut(origin).filter = merged;
        graph.mark_entry(origin);
        graph.add_edge(origin, dest);
    }

    debug!(
        nodes = graph.arena.len(),
        edges = graph.fwd.iter().map(|s| s.len()).sum::<usize>(),
        "typeflow subgraph built"
    );
    graph
}

fn intern_type_reached(graph: &mut FlowSubgraph, ty: TypeId) -> FlowNodeIdx {
    let idx = graph.intern(FlowNode::TypeReached(ty), || FlowNodeRecord {
        node: FlowNode::TypeReached(ty),
        label: format!("type reached: {}", ty),
        filter: TypeState::of([ty]),
        containing: Some(Fact::TypeInstantiated(ty)),
        makes_containing_reachable: false,
    });
    graph.mark_entry(idx);
    idx
}
