//! Type states
//!
//! A type state is the set of concrete runtime types that can flow through a
//! point of the analysis. The engine only needs the lattice operations
//! (union, intersection, subset), the "carries no causal information"
//! predicate, and a deterministic bitset rendering for export.
//!
//! Saturation is a widening event replacing a precise state with an
//! over-approximation of all instantiated types; a saturated state is a
//! superset of every other state.

use super::ids::TypeId;
use serde::{Deserialize, Serialize};

/// Deterministic set of type ids, kept sorted for value equality and hashing
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeIdSet {
    ids: Vec<TypeId>,
}

impl TypeIdSet {
    pub fn new() -> Self {
        Self { ids: Vec::new() }
    }

    pub fn from_ids(mut ids: Vec<TypeId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// Insert a type id, returning true if the set changed
    pub fn insert(&mut self, ty: TypeId) -> bool {
        match self.ids.binary_search(&ty) {
            Ok(_) => false,
            Err(pos) => {
                self.ids.insert(pos, ty);
                true
            }
        }
    }

    #[inline]
    pub fn contains(&self, ty: TypeId) -> bool {
        self.ids.binary_search(&ty).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.ids.iter().copied()
    }

    pub fn union(&self, other: &TypeIdSet) -> TypeIdSet {
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        TypeIdSet::from_ids(ids)
    }

    pub fn intersection(&self, other: &TypeIdSet) -> TypeIdSet {
        let ids = self
            .ids
            .iter()
            .copied()
            .filter(|ty| other.contains(*ty))
            .collect();
        TypeIdSet { ids }
    }

    pub fn is_subset_of(&self, other: &TypeIdSet) -> bool {
        self.ids.iter().all(|ty| other.contains(*ty))
    }
}

impl FromIterator<TypeId> for TypeIdSet {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        TypeIdSet::from_ids(iter.into_iter().collect())
    }
}

/// Type-state lattice value attached to a typeflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeState {
    /// Object-kinded flow that has seen no types yet
    Empty,

    /// Non-object flow; carries no type information at all
    Primitive,

    /// Concrete set of instantiated types
    Types(TypeIdSet),

    /// Widened to all instantiated types
    Saturated,
}

impl TypeState {
    pub fn of(ids: impl IntoIterator<Item = TypeId>) -> Self {
        TypeState::Types(ids.into_iter().collect())
    }

    #[inline]
    pub fn is_saturated(&self) -> bool {
        matches!(self, TypeState::Saturated)
    }

    /// True when the state carries no causal information: an empty or
    /// primitive state that was never saturated. Flows with such a filter
    /// are dropped from the exported subgraph.
    #[inline]
    pub fn is_empty_primitive(&self) -> bool {
        match self {
            TypeState::Empty | TypeState::Primitive => true,
            TypeState::Types(set) => set.is_empty(),
            TypeState::Saturated => false,
        }
    }

    pub fn union(&self, other: &TypeState) -> TypeState {
        use TypeState::*;
        match (self, other) {
            (Saturated, _) | (_, Saturated) => Saturated,
            (Empty, s) | (s, Empty) | (Primitive, s) | (s, Primitive) => s.clone(),
            (Types(a), Types(b)) => Types(a.union(b)),
        }
    }

    pub fn intersection(&self, other: &TypeState) -> TypeState {
        use TypeState::*;
        match (self, other) {
            (Saturated, s) | (s, Saturated) => s.clone(),
            (Empty, _) | (_, Empty) => Empty,
            (Primitive, _) | (_, Primitive) => Primitive,
            (Types(a), Types(b)) => Types(a.intersection(b)),
        }
    }

    /// Is every type of `self` contained in `other`?
    ///
    /// A saturated state is a superset of everything; empty and primitive
    /// states are subsets of everything.
    pub fn is_subset_of(&self, other: &TypeState) -> bool {
        use TypeState::*;
        match (self, other) {
            (_, Saturated) => true,
            (Empty, _) | (Primitive, _) => true,
            (Saturated, _) => false,
            (Types(a), Types(b)) => a.is_subset_of(b),
            (Types(a), _) => a.is_empty(),
        }
    }

    /// Render as a little-endian-bit-order bitset over `num_types` bits
    ///
    /// Bit `i` stands for the type with export id `i + 1`. The caller maps
    /// type ids to export ids first; saturated states render as all ones.
    pub fn bits(&self, num_types: usize, export_bit: impl Fn(TypeId) -> Option<usize>) -> Vec<u8> {
        let num_bytes = num_types.div_ceil(8);
        let mut bytes = vec![0u8; num_bytes];
        match self {
            TypeState::Empty | TypeState::Primitive => {}
            TypeState::Saturated => {
                for bit in 0..num_types {
                    bytes[bit / 8] |= 1 << (bit % 8);
                }
            }
            TypeState::Types(set) => {
                for ty in set.iter() {
                    if let Some(bit) = export_bit(ty) {
                        bytes[bit / 8] |= 1 << (bit % 8);
                    }
                }
            }
        }
        bytes
    }
}

impl Default for TypeState {
    fn default() -> Self {
        TypeState::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ids: &[u32]) -> TypeState {
        TypeState::of(ids.iter().map(|&i| TypeId(i)))
    }

    #[test]
    fn test_set_insert_is_sorted_and_deduped() {
        let mut set = TypeIdSet::new();
        assert!(set.insert(TypeId(5)));
        assert!(set.insert(TypeId(1)));
        assert!(!set.insert(TypeId(5)));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![TypeId(1), TypeId(5)]);
    }

    #[test]
    fn test_union_intersection() {
        let a = ts(&[1, 2]);
        let b = ts(&[2, 3]);
        assert_eq!(a.union(&b), ts(&[1, 2, 3]));
        assert_eq!(a.intersection(&b), ts(&[2]));
    }

    #[test]
    fn test_saturated_is_universal_superset() {
        let a = ts(&[1, 2, 3]);
        assert!(a.is_subset_of(&TypeState::Saturated));
        assert!(!TypeState::Saturated.is_subset_of(&a));
        assert_eq!(a.union(&TypeState::Saturated), TypeState::Saturated);
        assert_eq!(TypeState::Saturated.intersection(&a), a);
    }

    #[test]
    fn test_empty_primitive_predicate() {
        assert!(TypeState::Empty.is_empty_primitive());
        assert!(TypeState::Primitive.is_empty_primitive());
        assert!(ts(&[]).is_empty_primitive());
        assert!(!ts(&[1]).is_empty_primitive());
        assert!(!TypeState::Saturated.is_empty_primitive());
    }

    #[test]
    fn test_bitset_rendering() {
        // Export ids are 1-based; bit position = export id - 1.
        let state = ts(&[10, 12]);
        let bits = state.bits(10, |ty| match ty.0 {
            10 => Some(0),
            12 => Some(9),
            _ => None,
        });
        assert_eq!(bits.len(), 2);
        assert_eq!(bits[0], 0b0000_0001);
        assert_eq!(bits[1], 0b0000_0010);

        let full = TypeState::Saturated.bits(10, |_| None);
        assert_eq!(full, vec![0xFF, 0x03]);
    }
}
