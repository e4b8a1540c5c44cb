//! Fixed-point subgraph contraction
//!
//! Repeatedly removes flow nodes whose elimination loses no causal
//! information, splicing their predecessors directly to their successors.
//! A node is removable when its degree makes it a pass-through, every
//! successor's filter is a superset of its own (nothing the node admitted is
//! lost downstream), and its containing fact is uniform with the fan-out
//! side. Synthetic nodes carry semantic weight of their own and are never
//! removed.

use super::subgraph::FlowSubgraph;
use tracing::debug;

/// Pass bound. Each pass only shrinks the graph, so the bound limits how
/// completely the graph is contracted, never the truth of what remains.
pub const MAX_CONTRACTION_PASSES: usize = 10;

/// Contract `graph` to a fixed point (bounded)
///
/// Returns the number of removed nodes.
pub fn contract(graph: &mut FlowSubgraph) -> usize {
    let mut total_removed = 0;
    for pass in 0..MAX_CONTRACTION_PASSES {
        let removed = contract_pass(graph);
        total_removed += removed;
        debug!(pass, removed, "contraction pass");
        if removed == 0 {
            break;
        }
    }
    total_removed
}

fn contract_pass(graph: &mut FlowSubgraph) -> usize {
    let mut removed = 0;
    for v in 0..graph.arena.len() {
        if graph.removed[v] {
            continue;
        }
        if !is_removable(graph, v) {
            continue;
        }
        splice_out(graph, v);
        removed += 1;
    }
    removed
}

fn is_removable(graph: &FlowSubgraph, v: usize) -> bool {
    let record = graph.arena.record(super::super::domain::FlowNodeIdx(v as u32));
    if record.node.is_synthetic() || record.makes_containing_reachable {
        return false;
    }

    // Only pass-through nodes are candidates: a source or sink is the graph's
    // boundary, not redundant plumbing.
    let out_degree = graph.fwd[v].len();
    let in_degree = graph.rev[v].len() + usize::from(graph.entry[v]);
    if out_degree == 0 || in_degree == 0 {
        return false;
    }
    if out_degree > 1 && in_degree > 1 {
        return false;
    }

    for &s in &graph.fwd[v] {
        let succ = graph
            .arena
            .record(super::super::domain::FlowNodeIdx(s));
        if !record.filter.is_subset_of(&succ.filter) {
            return false;
        }
        if succ.containing != record.containing {
            return false;
        }
    }
    true
}

fn splice_out(graph: &mut FlowSubgraph, v: usize) {
    let preds: Vec<u32> = graph.rev[v].iter().copied().collect();
    let succs: Vec<u32> = graph.fwd[v].iter().copied().collect();

    for &p in &preds {
        graph.fwd[p as usize].remove(&(v as u32));
    }
    for &s in &succs {
        graph.rev[s as usize].remove(&(v as u32));
    }
    for &p in &preds {
        for &s in &succs {
            if p != s {
                graph.fwd[p as usize].insert(s);
                graph.rev[s as usize].insert(p);
            }
        }
    }
    if graph.entry[v] {
        for &s in &succs {
            graph.entry[s as usize] = true;
        }
    }
    graph.fwd[v].clear();
    graph.rev[v].clear();
    graph.entry[v] = false;
    graph.removed[v] = true;
}
