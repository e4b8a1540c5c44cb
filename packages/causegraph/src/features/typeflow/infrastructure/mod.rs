//! Typeflow subgraph building and contraction

pub mod contraction;
pub mod subgraph;

pub use contraction::{contract, MAX_CONTRACTION_PASSES};
pub use subgraph::{attribute_containing_method, build_subgraph, FlowSubgraph};
