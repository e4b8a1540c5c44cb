//! Recording strategies
//!
//! The process-wide tracer: Disabled, Coarse (method-level), or Fine
//! (per-typeflow). Every analysis hook enters through here.

pub mod application;

pub use application::{FlowRegistry, ProvenanceTracer, RecorderState};
