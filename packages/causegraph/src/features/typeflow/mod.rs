//! Typeflow subgraph (fine mode only)
//!
//! The fine strategy exports a finer dependency graph over typeflow nodes in
//! addition to the fact edges. Building attaches each surviving flow to a
//! containing fact; contraction then shrinks the graph by eliminating
//! pass-through nodes without losing causal truth.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    FlowDescriptor, FlowKind, FlowNode, FlowNodeArena, FlowNodeIdx, FlowNodeRecord, Frame,
};
pub use infrastructure::{build_subgraph, contract, FlowSubgraph, MAX_CONTRACTION_PASSES};
