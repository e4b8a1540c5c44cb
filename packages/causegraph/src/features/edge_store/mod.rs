//! Edge store & causal context
//!
//! Concurrent deduplicated edge sets shared by all analysis workers, plus
//! the per-thread justification stack. Recording is lock-free and
//! insert-only; the stores are drained exactly once at export.

pub mod application;
pub mod domain;

pub use application::{CauseScope, EdgeRecorder, FlowEdge, RecordedStores, SaturationScope};
pub use domain::{CauseToken, DirectEdge, HyperEdge};
