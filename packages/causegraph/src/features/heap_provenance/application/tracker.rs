//! Concurrent heap-provenance tracker
//!
//! Answers "whose code produced the value now in this slot" for
//! conjunctive-edge construction: the reader side comes from the scan
//! reason (the current causal context), the writer side from this table.

use super::super::domain::{HeapObjectProvenance, HeapShape};
use crate::features::edge_store::EdgeRecorder;
use crate::shared::models::{Fact, ObjectId, TypeId};
use dashmap::DashMap;

/// Tracks allocator and per-slot last-writer facts for simulated heap
/// objects
#[derive(Debug, Default)]
pub struct HeapTracker {
    objects: DashMap<ObjectId, HeapObjectProvenance>,
}

impl HeapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation; a `None` allocator resolves to the calling
    /// thread's current cause, falling back to the anonymous root
    pub fn trace_allocation(
        &self,
        allocator: Option<Fact>,
        recorder: &EdgeRecorder,
        obj: ObjectId,
        shape: HeapShape,
    ) {
        let allocator = allocator
            .or_else(|| recorder.current_cause())
            .unwrap_or(Fact::InitialRegistration);
        self.objects
            .insert(obj, HeapObjectProvenance::new(allocator, shape));
    }

    /// Record a slot write; untracked objects are ignored, untracked slots
    /// keep the allocator as their provenance
    pub fn trace_write(
        &self,
        writer: Option<Fact>,
        recorder: &EdgeRecorder,
        obj: ObjectId,
        slot: usize,
    ) {
        let writer = writer
            .or_else(|| recorder.current_cause())
            .unwrap_or(Fact::InitialRegistration);
        if let Some(mut provenance) = self.objects.get_mut(&obj) {
            provenance.shape.set_slot_writer(slot, writer);
        }
    }

    /// Record a clone: `dst` inherits `src`'s writer table with the
    /// allocator re-attributed to the cloner
    pub fn trace_clone(
        &self,
        cloner: Option<Fact>,
        recorder: &EdgeRecorder,
        src: ObjectId,
        dst: ObjectId,
    ) {
        let cloner = cloner
            .or_else(|| recorder.current_cause())
            .unwrap_or(Fact::InitialRegistration);
        let inherited = self.objects.get(&src).map(|p| p.cloned_by(cloner));
        if let Some(provenance) = inherited {
            self.objects.insert(dst, provenance);
        }
    }

    /// Allocator of `obj`; objects outside the table fall back to the
    /// unknown-heap-object sentinel of their class
    pub fn allocator_of(&self, obj: ObjectId, class: TypeId) -> Fact {
        self.objects
            .get(&obj)
            .map(|p| p.allocator.clone())
            .unwrap_or(Fact::UnknownHeapObject(class))
    }

    /// Last writer of `obj`'s slot; `None` for untouched slots and
    /// untracked objects
    pub fn slot_assigner(&self, obj: ObjectId, slot: usize) -> Option<Fact> {
        self.objects
            .get(&obj)
            .and_then(|p| p.shape.slot_writer(slot).cloned())
    }

    /// Emit `{writer, scan reason} -> consequence`
    ///
    /// The writer side is the slot's last writer when `slot` is given and
    /// was written, else the allocator, else the unknown-object sentinel.
    /// The reader side is the current causal context; without one the call
    /// degrades to a plain registration, where a root writer resolves
    /// through the (empty) context to a true root edge.
    pub fn register_edge_from_heap_object(
        &self,
        recorder: &EdgeRecorder,
        obj: ObjectId,
        class: TypeId,
        slot: Option<usize>,
        consequence: Fact,
    ) -> bool {
        let writer = slot
            .and_then(|s| self.slot_assigner(obj, s))
            .unwrap_or_else(|| self.allocator_of(obj, class));
        let reader = recorder.current_cause();
        recorder.register_conjunctive_edge(Some(writer), reader, consequence)
    }

    /// Number of tracked objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop all provenance; runs together with the edge-store drain
    pub fn clear(&self) {
        self.objects.clear();
    }
}
