//! Graph builder
//!
//! Turns the drained recording stores into the final pruned graph:
//! sanitize, seed roots, contract the typeflow subgraph, prune everything
//! without a forward path to an essential fact, finalize dense structures.

pub mod application;
pub mod domain;

pub use application::build_graph;
pub use domain::{FlowRecord, ProvenanceGraph};
