//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic (no external dependencies)
//! - application/ - Use cases
//! - infrastructure/ - External dependency implementations

pub mod edge_store;
pub mod export;
pub mod graph_builder;
pub mod heap_provenance;
pub mod strategy;
pub mod typeflow;
