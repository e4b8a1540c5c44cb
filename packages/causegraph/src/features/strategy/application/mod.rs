//! Strategy application layer: the tracer and its activation guard

pub mod tracer;

pub use tracer::{FlowRegistry, ProvenanceTracer, RecorderState};
