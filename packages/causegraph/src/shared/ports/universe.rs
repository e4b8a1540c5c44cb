//! Analysis universe port
//!
//! The points-to analysis owns the method/type/field metadata, the subtype
//! hierarchy, and the verdict on which elements survived later phases. The
//! builder and exporter consume that information through this port; the
//! recording hooks never touch it.

use crate::shared::models::{Fact, FieldId, MethodId, TypeId};

/// Collaborator interface over the analysis metadata
pub trait AnalysisUniverse: Send + Sync {
    /// Fully qualified type name; `None` when the lookup no longer resolves
    fn type_name(&self, ty: TypeId) -> Option<String>;

    /// Qualified method name
    fn method_name(&self, method: MethodId) -> Option<String>;

    /// Qualified field name
    fn field_name(&self, field: FieldId) -> Option<String>;

    /// Declaring type of a method; export degrades the parent link to 0 when
    /// this no longer resolves
    fn declaring_type(&self, method: MethodId) -> Option<TypeId>;

    /// Every exportable type
    fn all_types(&self) -> Vec<TypeId>;

    /// Types with no supertype in the exportable universe; preorder roots
    fn root_types(&self) -> Vec<TypeId>;

    /// Direct subtypes of a type
    fn subtype_children(&self, ty: TypeId) -> Vec<TypeId>;

    /// Class initializer of a type, if it declares one
    fn class_initializer(&self, ty: TypeId) -> Option<MethodId>;

    /// Was the class initializer invoked during the analysis run?
    fn initializer_invoked(&self, ty: TypeId) -> bool;

    /// Types whose reachability the analysis established
    fn reachable_types(&self) -> Vec<TypeId>;

    /// Must this fact survive pruning unconditionally?
    fn is_essential(&self, fact: &Fact) -> bool;

    /// Was the underlying element eliminated by a later phase? Unused facts
    /// vanish from the graph, taking their edges with them.
    fn is_unused(&self, fact: &Fact) -> bool;

    /// Deterministic human-readable label for a fact; drives export ordering
    fn fact_label(&self, fact: &Fact) -> String {
        let method = |m: MethodId| {
            self.method_name(m)
                .unwrap_or_else(|| format!("<missing {}>", m))
        };
        let ty = |t: TypeId| {
            self.type_name(t)
                .unwrap_or_else(|| format!("<missing {}>", t))
        };
        match fact {
            Fact::MethodReachable(m) => format!("{} [reachable]", method(*m)),
            Fact::MethodImplementationInvoked(m) => format!("{} [implementation invoked]", method(*m)),
            Fact::VirtualMethodInvoked(m) => format!("{} [virtual call target]", method(*m)),
            Fact::TypeReachable(t) => format!("{} [reachable]", ty(*t)),
            Fact::TypeInstantiated(t) => format!("{} [instantiated]", ty(*t)),
            Fact::UnknownHeapObject(t) => format!("{} [unknown heap object]", ty(*t)),
            Fact::RootRegistration(name) => format!("root registration: {}", name),
            Fact::ConfigurationRegistration(name) => format!("configuration: {}", name),
            Fact::BuildTimeClassInitializer(t) => format!("{} [build-time initializer]", ty(*t)),
            Fact::InitialRegistration => "initial registrations".to_string(),
        }
    }
}
