//! Shared value types: ids, facts, type states

pub mod fact;
pub mod ids;
pub mod type_state;

pub use fact::{Fact, FactKind};
pub use ids::{FieldId, FlowId, MethodId, ObjectId, TypeId};
pub use type_state::{TypeIdSet, TypeState};
