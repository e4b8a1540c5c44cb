//! Heap provenance tracker
//!
//! Who allocated, and who last wrote each field or element of, a simulated
//! heap object. Feeds the writer side of conjunctive edges when values are
//! scanned out of the heap.

pub mod application;
pub mod domain;

pub use application::HeapTracker;
pub use domain::{HeapObjectProvenance, HeapShape};
