//! Tracer strategies and process-wide activation
//!
//! One closed enum over the three granularity levels. Disabled carries no
//! state and every hook returns immediately; Coarse and Fine share the same
//! composed recorder state, Fine additionally accepts typeflow metadata.
//! The level is frozen process-wide on first activation.

use crate::features::edge_store::application::context;
use crate::features::edge_store::{CauseScope, EdgeRecorder, SaturationScope};
use crate::features::export::{BinaryExporter, ExportStats};
use crate::features::graph_builder::build_graph;
use crate::features::heap_provenance::{HeapShape, HeapTracker};
use crate::features::typeflow::FlowDescriptor;
use crate::config::{ExportOptions, TraceLevel, TracerConfig};
use crate::errors::{CausalityError, Result};
use crate::shared::models::{Fact, FlowId, MethodId, ObjectId, TypeId};
use crate::shared::ports::AnalysisUniverse;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

static INSTALLED: OnceCell<Arc<ProvenanceTracer>> = OnceCell::new();

/// Fine-mode typeflow metadata, registered by the analysis as flows are
/// created
#[derive(Debug, Default)]
pub struct FlowRegistry {
    descriptors: DashMap<FlowId, FlowDescriptor>,
}

impl FlowRegistry {
    pub fn describe(&self, descriptor: FlowDescriptor) {
        self.descriptors.insert(descriptor.id, descriptor);
    }

    pub fn is_all_instantiated(&self, id: FlowId) -> bool {
        self.descriptors
            .get(&id)
            .map(|d| d.is_all_instantiated())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Move all descriptors out, leaving the registry empty
    pub fn drain(&self) -> FxHashMap<FlowId, FlowDescriptor> {
        let out = self
            .descriptors
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        self.descriptors.clear();
        out
    }
}

/// Shared state composed into the enabled strategy variants
#[derive(Debug, Default)]
pub struct RecorderState {
    pub edges: EdgeRecorder,
    pub heap: HeapTracker,
    pub flows: FlowRegistry,
    /// Serializes dumps; recording never touches this lock
    dump_gate: Mutex<()>,
}

/// The active recording strategy
#[derive(Debug)]
pub enum ProvenanceTracer {
    /// Every hook is a no-op; `dump` is a configuration error
    Disabled,
    /// Method-level recording
    Coarse(RecorderState),
    /// Per-typeflow recording
    Fine(RecorderState),
}

impl ProvenanceTracer {
    /// Build a standalone tracer at the given level
    ///
    /// Embedders that manage their own sharing can skip the process-wide
    /// `activate` guard and hold the instance themselves.
    pub fn new(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Disabled => ProvenanceTracer::Disabled,
            TraceLevel::Coarse => ProvenanceTracer::Coarse(RecorderState::default()),
            TraceLevel::Fine => ProvenanceTracer::Fine(RecorderState::default()),
        }
    }

    /// Activate the process-wide tracer, freezing the level on first call
    ///
    /// A later call with the same level returns the same instance; a
    /// different level is a fatal misconfiguration. Workers receive the
    /// `Arc` by reference, never through implicit static access.
    pub fn activate(config: TracerConfig) -> Result<Arc<ProvenanceTracer>> {
        Self::activate_in(&INSTALLED, config)
    }

    fn activate_in(
        cell: &OnceCell<Arc<ProvenanceTracer>>,
        config: TracerConfig,
    ) -> Result<Arc<ProvenanceTracer>> {
        let tracer = cell.get_or_init(|| {
            info!(level = %config.level, "provenance tracer activated");
            Arc::new(ProvenanceTracer::new(config.level))
        });
        if tracer.level() != config.level {
            return Err(CausalityError::config(format!(
                "tracer already active at level {}, cannot re-activate at {}",
                tracer.level(),
                config.level
            )));
        }
        Ok(Arc::clone(tracer))
    }

    /// The installed tracer, if activation has happened
    pub fn installed() -> Option<Arc<ProvenanceTracer>> {
        INSTALLED.get().cloned()
    }

    pub fn level(&self) -> TraceLevel {
        match self {
            ProvenanceTracer::Disabled => TraceLevel::Disabled,
            ProvenanceTracer::Coarse(_) => TraceLevel::Coarse,
            ProvenanceTracer::Fine(_) => TraceLevel::Fine,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, ProvenanceTracer::Disabled)
    }

    pub fn is_fine(&self) -> bool {
        matches!(self, ProvenanceTracer::Fine(_))
    }

    fn state(&self) -> Option<&RecorderState> {
        match self {
            ProvenanceTracer::Disabled => None,
            ProvenanceTracer::Coarse(state) | ProvenanceTracer::Fine(state) => Some(state),
        }
    }

    fn fine_state(&self) -> Option<&RecorderState> {
        match self {
            ProvenanceTracer::Fine(state) => Some(state),
            _ => None,
        }
    }

    // ── Recording hooks ─────────────────────────────────────────────────

    /// Register `cause -> consequence`; `None` and root causes resolve to
    /// the calling thread's current context
    pub fn register_edge(&self, cause: Option<Fact>, consequence: Fact) {
        if let Some(state) = self.state() {
            state.edges.register_edge(cause, consequence);
        }
    }

    /// Register `{c1, c2} -> consequence`, degrading on missing causes
    pub fn register_conjunctive_edge(&self, c1: Option<Fact>, c2: Option<Fact>, consequence: Fact) {
        if let Some(state) = self.state() {
            state.edges.register_conjunctive_edge(c1, c2, consequence);
        }
    }

    /// A virtual call site resolved to a concrete implementation
    ///
    /// Emits `caller -> VirtualMethodInvoked(invoked)` plus the conjunctive
    /// edge requiring both the invocation and the receiver type's
    /// instantiation to justify the implementation.
    pub fn on_virtual_call_resolved(
        &self,
        invoked: MethodId,
        caller: Option<Fact>,
        concrete_type: TypeId,
        implementation: MethodId,
    ) {
        let Some(state) = self.state() else {
            return;
        };
        state
            .edges
            .register_edge(caller, Fact::VirtualMethodInvoked(invoked));
        state.edges.register_conjunctive_edge(
            Some(Fact::VirtualMethodInvoked(invoked)),
            Some(Fact::TypeInstantiated(concrete_type)),
            Fact::MethodImplementationInvoked(implementation),
        );
    }

    /// A type was instantiated; `None` instantiator resolves via context
    pub fn on_type_instantiated(&self, ty: TypeId, instantiator: Option<Fact>) {
        self.register_edge(instantiator, Fact::TypeInstantiated(ty));
    }

    /// A method became reachable; `None` reason resolves via context
    pub fn on_method_reachable(&self, method: MethodId, reason: Option<Fact>) {
        self.register_edge(reason, Fact::MethodReachable(method));
    }

    /// A typeflow edge was wired (fine mode)
    ///
    /// While the calling thread is saturating, edges out of the global
    /// all-instantiated flow are suppressed: recording them would make
    /// everything trivially reachable from everything.
    pub fn on_typeflow_edge(&self, from: Option<FlowId>, to: FlowId) {
        let Some(state) = self.fine_state() else {
            return;
        };
        if context::is_saturating() {
            if let Some(from) = from {
                if state.flows.is_all_instantiated(from) {
                    return;
                }
            }
        }
        state.edges.register_flow_edge(from, to);
    }

    /// A type entered `dest` by flowing out of the heap (fine mode);
    /// `None` cause resolves via context
    pub fn on_heap_flow(&self, cause: Option<Fact>, dest: FlowId, ty: TypeId) {
        let Some(state) = self.fine_state() else {
            return;
        };
        let cause = cause
            .or_else(|| state.edges.current_cause())
            .unwrap_or(Fact::InitialRegistration);
        state.edges.register_heap_flow(cause, dest, ty);
    }

    /// Register a live typeflow's metadata (fine mode)
    pub fn describe_flow(&self, descriptor: FlowDescriptor) {
        if let Some(state) = self.fine_state() {
            state.flows.describe(descriptor);
        }
    }

    // ── Heap provenance surface ─────────────────────────────────────────

    pub fn trace_allocation(&self, allocator: Option<Fact>, obj: ObjectId, shape: HeapShape) {
        if let Some(state) = self.state() {
            state.heap.trace_allocation(allocator, &state.edges, obj, shape);
        }
    }

    pub fn trace_write(&self, writer: Option<Fact>, obj: ObjectId, slot: usize) {
        if let Some(state) = self.state() {
            state.heap.trace_write(writer, &state.edges, obj, slot);
        }
    }

    pub fn trace_clone(&self, cloner: Option<Fact>, src: ObjectId, dst: ObjectId) {
        if let Some(state) = self.state() {
            state.heap.trace_clone(cloner, &state.edges, src, dst);
        }
    }

    /// Emit `{slot writer or allocator, current context} -> consequence`
    pub fn register_edge_from_heap_object(
        &self,
        obj: ObjectId,
        class: TypeId,
        slot: Option<usize>,
        consequence: Fact,
    ) {
        if let Some(state) = self.state() {
            state
                .heap
                .register_edge_from_heap_object(&state.edges, obj, class, slot, consequence);
        }
    }

    // ── Causal context surface ─────────────────────────────────────────

    /// Push `fact` as the calling thread's active cause for the returned
    /// scope's lifetime; inert on a disabled tracer
    #[track_caller]
    pub fn push_cause(&self, fact: Fact) -> Option<CauseScope> {
        self.state().map(|state| state.edges.push_cause(fact))
    }

    /// Like `push_cause`, but explicitly permitted to replace a live
    /// non-root scope
    #[track_caller]
    pub fn push_cause_rerooting(&self, fact: Fact) -> Option<CauseScope> {
        self.state()
            .map(|state| state.edges.push_cause_rerooting(fact))
    }

    /// Install `fact` as the sole active cause (worker task boundary)
    #[track_caller]
    pub fn set_cause(&self, fact: Fact) {
        if let Some(state) = self.state() {
            state.edges.set_cause(fact);
        }
    }

    /// Drop every context frame on the calling thread
    pub fn reset_cause(&self) {
        if let Some(state) = self.state() {
            state.edges.reset_cause();
        }
    }

    /// The calling thread's current active cause
    pub fn current_cause(&self) -> Option<Fact> {
        self.state().and_then(|state| state.edges.current_cause())
    }

    /// Mark the calling thread as saturating for the guard's lifetime
    pub fn saturation_scope(&self) -> SaturationScope {
        context::enter_saturation()
    }

    // ── Export ──────────────────────────────────────────────────────────

    /// Build, prune, and export the recorded graph, then clear the stores
    ///
    /// Single-shot: the accumulators are drained during the build, so a
    /// second dump starts from an empty graph. Dumping a disabled tracer is
    /// a configuration error.
    pub fn dump(
        &self,
        universe: &dyn AnalysisUniverse,
        out_dir: &Path,
        options: &ExportOptions,
    ) -> Result<ExportStats> {
        let state = self
            .state()
            .ok_or_else(|| CausalityError::config("cannot dump a disabled tracer"))?;
        let _gate = state.dump_gate.lock();

        let stores = state.edges.drain();
        state.heap.clear();
        let descriptors = self.is_fine().then(|| state.flows.drain());
        debug!(
            direct = stores.direct.len(),
            hyper = stores.hyper.len(),
            flow_edges = stores.flow_edges.len(),
            "dumping provenance graph"
        );

        let graph = build_graph(universe, stores, descriptors.as_ref());
        BinaryExporter::new(universe).export(&graph, out_dir, options)
    }
}
