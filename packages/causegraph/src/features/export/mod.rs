//! Binary export
//!
//! Deterministic multi-stream little-endian serialization of the pruned
//! graph, plus a JSON manifest with counts and stream sizes.

pub mod application;

pub use application::{BinaryExporter, ExportStats};
