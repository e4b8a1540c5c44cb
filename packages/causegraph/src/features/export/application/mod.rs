//! Export application layer

pub mod writer;

pub use writer::{BinaryExporter, ExportStats};
