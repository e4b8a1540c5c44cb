//! Edge-store application layer: recorder and per-thread context

pub mod context;
pub mod recorder;

pub use context::{CauseScope, SaturationScope};
pub use recorder::{EdgeRecorder, FlowEdge, RecordedStores};
