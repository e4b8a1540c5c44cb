//! Heap-provenance domain types
//!
//! For heap objects that exist purely as analysis artifacts (not backed by a
//! hosted object), the engine remembers who allocated them and whose code
//! last wrote each slot. Three shapes cover the object universe; primitive
//! arrays carry no per-element provenance and are registered as `Plain`.

use crate::shared::models::Fact;

/// Writer-slot layout of a tracked heap object
#[derive(Debug, Clone)]
pub enum HeapShape {
    /// No tracked slots; only the allocator matters
    Plain,

    /// One writer slot per declared instance field, indexed by field
    /// position
    Instance { field_writers: Vec<Option<Fact>> },

    /// One writer slot per element
    ObjectArray { element_writers: Vec<Option<Fact>> },
}

impl HeapShape {
    /// Instance shape with `field_count` untouched slots
    pub fn instance(field_count: usize) -> Self {
        HeapShape::Instance {
            field_writers: vec![None; field_count],
        }
    }

    /// Object-array shape with `length` untouched slots
    pub fn object_array(length: usize) -> Self {
        HeapShape::ObjectArray {
            element_writers: vec![None; length],
        }
    }

    /// Writer of the given slot, if the shape has one and it was written
    pub fn slot_writer(&self, slot: usize) -> Option<&Fact> {
        match self {
            HeapShape::Plain => None,
            HeapShape::Instance { field_writers } => {
                field_writers.get(slot).and_then(|w| w.as_ref())
            }
            HeapShape::ObjectArray { element_writers } => {
                element_writers.get(slot).and_then(|w| w.as_ref())
            }
        }
    }

    /// Last-writer-wins slot update; out-of-range slots are ignored
    pub fn set_slot_writer(&mut self, slot: usize, writer: Fact) {
        let slots = match self {
            HeapShape::Plain => return,
            HeapShape::Instance { field_writers } => field_writers,
            HeapShape::ObjectArray { element_writers } => element_writers,
        };
        if let Some(entry) = slots.get_mut(slot) {
            *entry = Some(writer);
        }
    }
}

/// Allocator plus writer table of one tracked heap object
#[derive(Debug, Clone)]
pub struct HeapObjectProvenance {
    pub allocator: Fact,
    pub shape: HeapShape,
}

impl HeapObjectProvenance {
    pub fn new(allocator: Fact, shape: HeapShape) -> Self {
        Self { allocator, shape }
    }

    /// Clone for a fresh object: the writer table is inherited, the
    /// allocator is re-attributed to the cloner
    pub fn cloned_by(&self, cloner: Fact) -> Self {
        Self {
            allocator: cloner,
            shape: self.shape.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::MethodId;

    fn m(i: u32) -> Fact {
        Fact::MethodReachable(MethodId(i))
    }

    #[test]
    fn test_slot_writer_last_wins() {
        let mut shape = HeapShape::instance(2);
        assert!(shape.slot_writer(0).is_none());
        shape.set_slot_writer(0, m(1));
        shape.set_slot_writer(0, m(2));
        assert_eq!(shape.slot_writer(0), Some(&m(2)));
        assert!(shape.slot_writer(1).is_none());
    }

    #[test]
    fn test_plain_has_no_slots() {
        let mut shape = HeapShape::Plain;
        shape.set_slot_writer(0, m(1));
        assert!(shape.slot_writer(0).is_none());
    }

    #[test]
    fn test_clone_reattributes_allocator() {
        let mut src = HeapObjectProvenance::new(m(1), HeapShape::object_array(1));
        src.shape.set_slot_writer(0, m(2));
        let dst = src.cloned_by(m(3));
        assert_eq!(dst.allocator, m(3));
        assert_eq!(dst.shape.slot_writer(0), Some(&m(2)));
    }
}
