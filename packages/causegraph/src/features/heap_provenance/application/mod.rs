//! Heap-provenance application layer

pub mod tracker;

pub use tracker::HeapTracker;
