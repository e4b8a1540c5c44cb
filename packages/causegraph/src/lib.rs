/*
 * Causegraph - Causality/Provenance Graph Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Fact, TypeState, ids) and ports
 * - features/    : Vertical slices (edge_store → heap_provenance → strategy
 *                  → typeflow → graph_builder → export)
 * - config/      : Tracer configuration
 *
 * Records "why is X in the build" justification edges concurrently while a
 * whole-program points-to analysis runs, then sanitizes, prunes, and exports
 * a deterministic binary graph.
 */

// Crate-level lint configuration
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::len_without_is_empty)] // Some counters have no empty notion

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{ExportOptions, TraceLevel, TracerConfig};
pub use errors::{CausalityError, Result};
pub use features::edge_store::{CauseScope, DirectEdge, EdgeRecorder, HyperEdge, SaturationScope};
pub use features::export::{BinaryExporter, ExportStats};
pub use features::graph_builder::{build_graph, FlowRecord, ProvenanceGraph};
pub use features::heap_provenance::{HeapShape, HeapTracker};
pub use features::strategy::ProvenanceTracer;
pub use features::typeflow::{FlowDescriptor, FlowKind, Frame};
pub use shared::models::{Fact, FactKind, FieldId, FlowId, MethodId, ObjectId, TypeId, TypeIdSet, TypeState};
pub use shared::ports::AnalysisUniverse;
