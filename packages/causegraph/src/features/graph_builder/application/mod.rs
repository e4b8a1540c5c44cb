//! Graph-builder application layer

pub mod builder;

pub use builder::build_graph;
