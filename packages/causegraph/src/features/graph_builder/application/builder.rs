//! Graph construction: sanitize, seed, prune, finalize
//!
//! Runs single-threaded at export time over the drained stores. Sanitizing
//! drops edges touching analysis elements a later phase eliminated and
//! injects the class-initializer dependencies; pruning then keeps only
//! nodes with a forward path to an essential fact. A root that justifies
//! nothing essential disappears here.

use super::super::domain::{FlowRecord, ProvenanceGraph};
use crate::features::edge_store::{DirectEdge, HyperEdge, RecordedStores};
use crate::features::typeflow::domain::{FlowDescriptor, FlowNodeIdx};
use crate::features::typeflow::infrastructure::{build_subgraph, contract, FlowSubgraph};
use crate::shared::models::{Fact, FlowId};
use crate::shared::ports::AnalysisUniverse;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::debug;

/// Build the final graph from the drained stores
///
/// `descriptors` is `Some` in fine mode only; without it the flow-edge and
/// heap-flow stores are ignored.
pub fn build_graph(
    universe: &dyn AnalysisUniverse,
    stores: RecordedStores,
    descriptors: Option<&FxHashMap<FlowId, FlowDescriptor>>,
) -> ProvenanceGraph {
    let RecordedStores {
        mut direct,
        hyper,
        flow_edges,
        heap_flows,
    } = stores;

    // Sanitize: inject initializer dependencies, then drop edges with an
    // eliminated endpoint.
    for ty in universe.reachable_types() {
        if !universe.initializer_invoked(ty) {
            continue;
        }
        let Some(init) = universe.class_initializer(ty) else {
            continue;
        };
        direct.push(DirectEdge::new(
            Some(Fact::TypeReachable(ty)),
            Fact::MethodReachable(init),
        ));
    }
    let live = |f: &Fact| !universe.is_unused(f);
    direct.retain(|e| live(&e.consequence) && e.cause.as_ref().map_or(true, live));
    let hyper: Vec<HyperEdge> = hyper
        .into_iter()
        .filter(|e| live(&e.consequence) && e.causes().iter().all(live))
        .collect();

    // Fine mode: build and contract the typeflow subgraph.
    let mut subgraph = match descriptors {
        Some(descriptors) => {
            let mut graph = build_subgraph(descriptors, &flow_edges, &heap_flows);
            let removed = contract(&mut graph);
            debug!(removed, live = graph.live_count(), "typeflow subgraph contracted");
            graph
        }
        None => FlowSubgraph::default(),
    };
    // Eliminated containing facts take their links with them.
    for v in 0..subgraph.arena.len() {
        let record = subgraph.arena.record_mut(FlowNodeIdx(v as u32));
        if record.containing.as_ref().is_some_and(|f| !live(f)) {
            record.containing = None;
        }
    }

    // Pruning universe: facts and live flow nodes, edges reversed so a
    // breadth-first walk from the essential facts discovers everything with
    // a forward path into them.
    let mut prune: DiGraph<(), ()> = DiGraph::new();
    let mut fact_nodes: FxHashMap<Fact, NodeIndex> = FxHashMap::default();
    let mut intern_fact = |prune: &mut DiGraph<(), ()>, fact: &Fact| -> NodeIndex {
        *fact_nodes
            .entry(fact.clone())
            .or_insert_with(|| prune.add_node(()))
    };

    for edge in &direct {
        let cons = intern_fact(&mut prune, &edge.consequence);
        if let Some(cause) = &edge.cause {
            let cause = intern_fact(&mut prune, cause);
            prune.add_edge(cons, cause, ());
        }
    }
    for edge in &hyper {
        let cons = intern_fact(&mut prune, &edge.consequence);
        for cause in edge.causes() {
            let cause = intern_fact(&mut prune, cause);
            prune.add_edge(cons, cause, ());
        }
    }

    let mut flow_prune_nodes: Vec<Option<NodeIndex>> = vec![None; subgraph.arena.len()];
    for (idx, record) in subgraph.arena.iter() {
        let v = idx.0 as usize;
        if subgraph.removed[v] {
            continue;
        }
        let node = prune.add_node(());
        flow_prune_nodes[v] = Some(node);
        if let Some(containing) = &record.containing {
            let fact = intern_fact(&mut prune, containing);
            if record.makes_containing_reachable {
                // Flow causes fact: the fact's justification runs through it.
                prune.add_edge(fact, node, ());
            } else {
                // Fact gates flow.
                prune.add_edge(node, fact, ());
            }
        }
    }
    for v in 0..subgraph.arena.len() {
        let Some(from) = flow_prune_nodes[v] else {
            continue;
        };
        for &succ in &subgraph.fwd[v] {
            if let Some(to) = flow_prune_nodes[succ as usize] {
                prune.add_edge(to, from, ());
            }
        }
    }

    // Multi-source BFS from the essential facts.
    let mut visited = vec![false; prune.node_count()];
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();
    for (fact, &node) in &fact_nodes {
        if universe.is_essential(fact) {
            visited[node.index()] = true;
            queue.push_back(node);
        }
    }
    while let Some(node) = queue.pop_front() {
        for next in prune.neighbors(node) {
            if !visited[next.index()] {
                visited[next.index()] = true;
                queue.push_back(next);
            }
        }
    }

    // Finalize into dense, deterministically ordered structures.
    let mut facts: Vec<Fact> = fact_nodes
        .iter()
        .filter(|(_, node)| visited[node.index()])
        .map(|(fact, _)| fact.clone())
        .collect();
    facts.sort();
    let fact_index: FxHashMap<&Fact, u32> = facts
        .iter()
        .enumerate()
        .map(|(i, f)| (f, i as u32))
        .collect();
    let kept = |fact: &Fact| fact_index.get(fact).copied();

    let mut direct_rows: FxHashSet<(Option<u32>, u32)> = FxHashSet::default();
    for edge in &direct {
        let Some(cons) = kept(&edge.consequence) else {
            continue;
        };
        // A kept consequence implies a kept cause: the cause reaches the
        // essential set through this very edge.
        let cause = edge.cause.as_ref().map(|c| {
            kept(c).unwrap_or_else(|| unreachable!("cause of kept consequence was pruned"))
        });
        direct_rows.insert((cause, cons));
    }
    // Every surviving root fact gets an explicit root row.
    for (i, fact) in facts.iter().enumerate() {
        if fact.is_root() {
            direct_rows.insert((None, i as u32));
        }
    }
    let mut direct_rows: Vec<_> = direct_rows.into_iter().collect();
    direct_rows.sort();

    let mut hyper_rows: FxHashSet<(u32, u32, u32)> = FxHashSet::default();
    for edge in &hyper {
        let Some(cons) = kept(&edge.consequence) else {
            continue;
        };
        let [c1, c2] = edge.causes();
        let (Some(i1), Some(i2)) = (kept(c1), kept(c2)) else {
            continue;
        };
        hyper_rows.insert((i1.min(i2), i1.max(i2), cons));
    }
    let mut hyper_rows: Vec<_> = hyper_rows.into_iter().collect();
    hyper_rows.sort();

    let mut flow_dense: Vec<Option<u32>> = vec![None; subgraph.arena.len()];
    let mut flows: Vec<FlowRecord> = Vec::new();
    for (idx, record) in subgraph.arena.iter() {
        let v = idx.0 as usize;
        let Some(node) = flow_prune_nodes[v] else {
            continue;
        };
        if !visited[node.index()] {
            continue;
        }
        flow_dense[v] = Some(flows.len() as u32);
        flows.push(FlowRecord {
            label: record.label.clone(),
            filter: record.filter.clone(),
            containing: record.containing.as_ref().and_then(&kept),
            makes_containing_reachable: record.makes_containing_reachable,
        });
    }

    let mut flow_rows: FxHashSet<(Option<u32>, u32)> = FxHashSet::default();
    for v in 0..subgraph.arena.len() {
        let Some(from) = flow_dense[v] else {
            continue;
        };
        if subgraph.entry[v] {
            flow_rows.insert((None, from));
        }
        for &succ in &subgraph.fwd[v] {
            if let Some(to) = flow_dense[succ as usize] {
                flow_rows.insert((Some(from), to));
            }
        }
    }
    let mut flow_rows: Vec<_> = flow_rows.into_iter().collect();
    flow_rows.sort();

    debug!(
        facts = facts.len(),
        flows = flows.len(),
        direct = direct_rows.len(),
        hyper = hyper_rows.len(),
        flow_edges = flow_rows.len(),
        "provenance graph built"
    );
    ProvenanceGraph {
        facts,
        flows,
        direct: direct_rows,
        hyper: hyper_rows,
        flow_edges: flow_rows,
    }
}
