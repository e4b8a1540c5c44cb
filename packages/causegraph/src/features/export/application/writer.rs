//! Deterministic multi-stream binary export
//!
//! Writes the finalized graph into a directory of fixed-layout streams,
//! comparable byte for byte across runs: facts and flows are ordered by
//! their display label, types by subtype-hierarchy preorder so related
//! types get contiguous export ids. Export ids are 1-based; 0 encodes
//! "root" in the fact streams and "entry" in the flow streams.

use crate::config::ExportOptions;
use crate::errors::{CausalityError, Result};
use crate::features::graph_builder::ProvenanceGraph;
use crate::shared::models::{FactKind, TypeId};
use crate::shared::ports::AnalysisUniverse;
use byteorder::{LittleEndian, WriteBytesExt};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// More types cannot be addressed by the bitset encoding without widening
/// the format; the exporter fails rather than truncating.
const MAX_EXPORT_TYPES: usize = 65_535;
/// Kind ordinals are encoded in one byte.
const MAX_EXPORT_KINDS: usize = 256;
/// The MSB of a `typeflow_methods.bin` entry is the direction flag.
const FLIPPED_CONTAINING_BIT: u32 = 1 << 31;

/// Entity counts and per-stream byte sizes, also written as `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportStats {
    pub facts: usize,
    pub flows: usize,
    pub types: usize,
    pub kinds: usize,
    pub direct_edges: usize,
    pub hyper_edges: usize,
    pub flow_edges: usize,
    pub typestates: usize,
    pub bytes_written: u64,
    pub streams: BTreeMap<String, u64>,
}

/// Writes a `ProvenanceGraph` to a stream directory
pub struct BinaryExporter<'a> {
    universe: &'a dyn AnalysisUniverse,
}

impl<'a> BinaryExporter<'a> {
    pub fn new(universe: &'a dyn AnalysisUniverse) -> Self {
        Self { universe }
    }

    pub fn export(
        &self,
        graph: &ProvenanceGraph,
        dir: &Path,
        options: &ExportOptions,
    ) -> Result<ExportStats> {
        let type_order = self.type_preorder();
        if type_order.len() > MAX_EXPORT_TYPES {
            return Err(CausalityError::export(format!(
                "{} exportable types exceed the format limit of {}",
                type_order.len(),
                MAX_EXPORT_TYPES
            )));
        }
        if FactKind::ALL.len() > MAX_EXPORT_KINDS {
            return Err(CausalityError::export(format!(
                "{} fact kinds exceed the one-byte encoding",
                FactKind::ALL.len()
            )));
        }
        // Export ids are 1-based; bit position in the typestate bitsets is
        // export id - 1.
        let type_export: FxHashMap<TypeId, u32> = type_order
            .iter()
            .enumerate()
            .map(|(i, &ty)| (ty, i as u32 + 1))
            .collect();

        let fact_export = self.label_order(graph.facts.len(), |i| {
            self.universe.fact_label(&graph.facts[i])
        });
        let flow_export = self.label_order(graph.flows.len(), |i| graph.flows[i].label.clone());

        // Typestate table: identical bitsets share one entry. First-seen
        // order over the export-ordered flows keeps the table deterministic.
        let export_bit = |ty: TypeId| type_export.get(&ty).map(|&id| (id - 1) as usize);
        let mut typestate_table: Vec<Vec<u8>> = Vec::new();
        let mut typestate_ids: FxHashMap<Vec<u8>, u32> = FxHashMap::default();
        let mut flow_filters: Vec<u32> = vec![0; graph.flows.len()];
        for &flow_idx in &flow_export.order {
            let flow = &graph.flows[flow_idx as usize];
            let bits = flow.filter.bits(type_order.len(), export_bit);
            let id = *typestate_ids.entry(bits.clone()).or_insert_with(|| {
                typestate_table.push(bits);
                typestate_table.len() as u32 - 1
            });
            flow_filters[flow_idx as usize] = id;
        }

        fs::create_dir_all(dir)?;
        let mut streams: BTreeMap<String, u64> = BTreeMap::new();
        let mut put = |name: &str, bytes: Vec<u8>| -> Result<()> {
            streams.insert(name.to_string(), bytes.len() as u64);
            fs::write(dir.join(name), bytes)?;
            Ok(())
        };

        let types_txt: Vec<u8> = type_order
            .iter()
            .map(|&ty| {
                self.universe
                    .type_name(ty)
                    .unwrap_or_else(|| format!("<missing {}>", ty))
            })
            .flat_map(|name| {
                let mut line = name.into_bytes();
                line.push(b'\n');
                line
            })
            .collect();
        put("types.txt", types_txt)?;

        let kinds_txt: Vec<u8> = FactKind::ALL
            .iter()
            .flat_map(|kind| {
                let mut line = kind.name().as_bytes().to_vec();
                line.push(b'\n');
                line
            })
            .collect();
        put("kinds.txt", kinds_txt)?;

        let mut node_kinds = Vec::with_capacity(graph.facts.len());
        let mut node_parents = Vec::with_capacity(graph.facts.len() * 4);
        for &fact_idx in &fact_export.order {
            let fact = &graph.facts[fact_idx as usize];
            node_kinds.push(fact.kind().ordinal());
            // Enclosing hierarchy: the declaring type for method facts; type
            // facts anchor to their own subject type, so consumers group
            // them under that type's subtree. 0 when the lookup degrades.
            let parent = fact
                .method()
                .and_then(|m| self.universe.declaring_type(m))
                .or_else(|| fact.type_id())
                .and_then(|ty| type_export.get(&ty).copied())
                .unwrap_or(0);
            node_parents.write_u32::<LittleEndian>(parent)?;
        }
        put("node_kinds.bin", node_kinds)?;
        put("node_parents.bin", node_parents)?;

        let mut direct_pairs: Vec<(u32, u32)> = graph
            .direct
            .iter()
            .map(|&(cause, cons)| {
                (
                    cause.map_or(0, |c| fact_export.id(c)),
                    fact_export.id(cons),
                )
            })
            .collect();
        direct_pairs.sort_unstable();
        direct_pairs.dedup();
        let mut direct_bin = Vec::with_capacity(direct_pairs.len() * 8);
        for (src, dst) in &direct_pairs {
            direct_bin.write_u32::<LittleEndian>(*src)?;
            direct_bin.write_u32::<LittleEndian>(*dst)?;
        }
        put("direct_invokes.bin", direct_bin)?;

        let mut hyper_triples: Vec<(u32, u32, u32)> = graph
            .hyper
            .iter()
            .map(|&(c1, c2, cons)| {
                let a = fact_export.id(c1);
                let b = fact_export.id(c2);
                (a.min(b), a.max(b), fact_export.id(cons))
            })
            .collect();
        hyper_triples.sort_unstable();
        hyper_triples.dedup();
        let mut hyper_bin = Vec::with_capacity(hyper_triples.len() * 12);
        for (c1, c2, dst) in &hyper_triples {
            hyper_bin.write_u32::<LittleEndian>(*c1)?;
            hyper_bin.write_u32::<LittleEndian>(*c2)?;
            hyper_bin.write_u32::<LittleEndian>(*dst)?;
        }
        put("hyper_edges.bin", hyper_bin)?;

        let mut flow_pairs: Vec<(u32, u32)> = graph
            .flow_edges
            .iter()
            .map(|&(from, to)| (from.map_or(0, |f| flow_export.id(f)), flow_export.id(to)))
            .collect();
        flow_pairs.sort_unstable();
        flow_pairs.dedup();
        let mut interflows = Vec::with_capacity(flow_pairs.len() * 8);
        for (from, to) in &flow_pairs {
            interflows.write_u32::<LittleEndian>(*from)?;
            interflows.write_u32::<LittleEndian>(*to)?;
        }
        put("interflows.bin", interflows)?;

        let mut filters_bin = Vec::with_capacity(graph.flows.len() * 4);
        let mut methods_bin = Vec::with_capacity(graph.flows.len() * 4);
        for &flow_idx in &flow_export.order {
            let flow = &graph.flows[flow_idx as usize];
            filters_bin.write_u32::<LittleEndian>(flow_filters[flow_idx as usize])?;
            let mut containing = flow.containing.map_or(0, |f| fact_export.id(f));
            if flow.makes_containing_reachable {
                containing |= FLIPPED_CONTAINING_BIT;
            }
            methods_bin.write_u32::<LittleEndian>(containing)?;
        }
        put("typeflow_filters.bin", filters_bin)?;
        put("typeflow_methods.bin", methods_bin)?;

        let typestates_bin: Vec<u8> = typestate_table.concat();
        put("typestates.bin", typestates_bin)?;

        if options.emit_text_dumps {
            let methods_txt: Vec<u8> = fact_export
                .order
                .iter()
                .flat_map(|&i| {
                    let mut line = self
                        .universe
                        .fact_label(&graph.facts[i as usize])
                        .into_bytes();
                    line.push(b'\n');
                    line
                })
                .collect();
            put("methods.txt", methods_txt)?;

            let typeflows_txt: Vec<u8> = flow_export
                .order
                .iter()
                .flat_map(|&i| {
                    let mut line = graph.flows[i as usize].label.clone().into_bytes();
                    line.push(b'\n');
                    line
                })
                .collect();
            put("typeflows.txt", typeflows_txt)?;
        }

        let bytes_written = streams.values().sum();
        let stats = ExportStats {
            facts: graph.facts.len(),
            flows: graph.flows.len(),
            types: type_order.len(),
            kinds: FactKind::ALL.len(),
            direct_edges: direct_pairs.len(),
            hyper_edges: hyper_triples.len(),
            flow_edges: flow_pairs.len(),
            typestates: typestate_table.len(),
            bytes_written,
            streams,
        };
        fs::write(dir.join("manifest.json"), serde_json::to_vec_pretty(&stats)?)?;

        info!(
            facts = stats.facts,
            flows = stats.flows,
            types = stats.types,
            bytes = stats.bytes_written,
            dir = %dir.display(),
            "provenance graph exported"
        );
        Ok(stats)
    }

    /// Subtype-hierarchy preorder over the exportable types
    ///
    /// Depth-first from the hierarchy roots so related types get contiguous
    /// ids; types the hierarchy no longer reaches are appended in id order.
    fn type_preorder(&self) -> Vec<TypeId> {
        let mut order = Vec::new();
        let mut visited: FxHashSet<TypeId> = FxHashSet::default();
        let mut stack: Vec<TypeId> = self.universe.root_types();
        stack.reverse();
        while let Some(ty) = stack.pop() {
            if !visited.insert(ty) {
                continue;
            }
            order.push(ty);
            let mut children = self.universe.subtype_children(ty);
            children.reverse();
            stack.extend(children);
        }
        let mut stragglers: Vec<TypeId> = self
            .universe
            .all_types()
            .into_iter()
            .filter(|ty| !visited.contains(ty))
            .collect();
        stragglers.sort_unstable();
        order.extend(stragglers);
        order
    }

    /// Deterministic label ordering over `len` entities
    fn label_order(&self, len: usize, label: impl Fn(usize) -> String + Sync) -> LabelOrder {
        let labels: Vec<String> = (0..len).map(&label).collect();
        let mut order: Vec<u32> = (0..len as u32).collect();
        order.par_sort_unstable_by(|&a, &b| {
            labels[a as usize]
                .cmp(&labels[b as usize])
                .then(a.cmp(&b))
        });
        let mut export_ids = vec![0u32; len];
        for (pos, &idx) in order.iter().enumerate() {
            export_ids[idx as usize] = pos as u32 + 1;
        }
        LabelOrder { order, export_ids }
    }
}

/// Label-sorted permutation with its inverse 1-based id map
struct LabelOrder {
    /// Internal indices in export order
    order: Vec<u32>,
    export_ids: Vec<u32>,
}

impl LabelOrder {
    #[inline]
    fn id(&self, internal: u32) -> u32 {
        self.export_ids[internal as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::graph_builder::FlowRecord;
    use crate::shared::models::{Fact, FieldId, MethodId, TypeState};
    use tempfile::tempdir;

    struct TreeUniverse {
        /// Parent-indexed hierarchy: `children[i]` are subtypes of `TypeId(i)`
        children: Vec<Vec<TypeId>>,
        extra_types: Vec<TypeId>,
    }

    impl TreeUniverse {
        fn new() -> Self {
            Self {
                // 0 -> {1, 2}, 1 -> {3}
                children: vec![
                    vec![TypeId(1), TypeId(2)],
                    vec![TypeId(3)],
                    Vec::new(),
                    Vec::new(),
                ],
                extra_types: Vec::new(),
            }
        }
    }

    impl AnalysisUniverse for TreeUniverse {
        fn type_name(&self, ty: TypeId) -> Option<String> {
            Some(format!("pkg.Type{}", ty.0))
        }
        fn method_name(&self, method: MethodId) -> Option<String> {
            Some(format!("pkg.Type0.method{}()", method.0))
        }
        fn field_name(&self, field: FieldId) -> Option<String> {
            Some(format!("field{}", field.0))
        }
        fn declaring_type(&self, method: MethodId) -> Option<TypeId> {
            (method.0 != 99).then_some(TypeId(0))
        }
        fn all_types(&self) -> Vec<TypeId> {
            let mut all: Vec<TypeId> = (0..self.children.len() as u32).map(TypeId).collect();
            all.extend(&self.extra_types);
            all
        }
        fn root_types(&self) -> Vec<TypeId> {
            vec![TypeId(0)]
        }
        fn subtype_children(&self, ty: TypeId) -> Vec<TypeId> {
            self.children
                .get(ty.0 as usize)
                .cloned()
                .unwrap_or_default()
        }
        fn class_initializer(&self, _: TypeId) -> Option<MethodId> {
            None
        }
        fn initializer_invoked(&self, _: TypeId) -> bool {
            false
        }
        fn reachable_types(&self) -> Vec<TypeId> {
            Vec::new()
        }
        fn is_essential(&self, _: &Fact) -> bool {
            true
        }
        fn is_unused(&self, _: &Fact) -> bool {
            false
        }
    }

    fn sample_graph() -> ProvenanceGraph {
        ProvenanceGraph {
            facts: vec![
                Fact::MethodReachable(MethodId(2)),
                Fact::MethodReachable(MethodId(1)),
                Fact::TypeInstantiated(TypeId(1)),
            ],
            flows: vec![
                FlowRecord {
                    label: "b flow".into(),
                    filter: TypeState::of([TypeId(1)]),
                    containing: Some(1),
                    makes_containing_reachable: false,
                },
                FlowRecord {
                    label: "a flow".into(),
                    filter: TypeState::of([TypeId(1)]),
                    containing: Some(2),
                    makes_containing_reachable: true,
                },
            ],
            direct: vec![(None, 1), (Some(1), 0), (Some(0), 2)],
            hyper: vec![(0, 1, 2)],
            flow_edges: vec![(None, 1), (Some(1), 0)],
        }
    }

    #[test]
    fn test_type_preorder_keeps_hierarchy_contiguous() {
        let universe = TreeUniverse::new();
        let exporter = BinaryExporter::new(&universe);
        assert_eq!(
            exporter.type_preorder(),
            vec![TypeId(0), TypeId(1), TypeId(3), TypeId(2)]
        );
    }

    #[test]
    fn test_export_writes_all_streams() {
        let universe = TreeUniverse::new();
        let dir = tempdir().unwrap();
        let stats = BinaryExporter::new(&universe)
            .export(&sample_graph(), dir.path(), &ExportOptions::default())
            .unwrap();

        assert_eq!(stats.facts, 3);
        assert_eq!(stats.flows, 2);
        assert_eq!(stats.types, 4);
        for name in [
            "types.txt",
            "kinds.txt",
            "node_kinds.bin",
            "node_parents.bin",
            "direct_invokes.bin",
            "hyper_edges.bin",
            "interflows.bin",
            "typeflow_filters.bin",
            "typeflow_methods.bin",
            "typestates.bin",
            "manifest.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing stream {}", name);
        }
        assert!(!dir.path().join("methods.txt").exists());

        // One byte per fact; identical filters share one typestate entry.
        assert_eq!(
            fs::read(dir.path().join("node_kinds.bin")).unwrap().len(),
            3
        );
        assert_eq!(stats.typestates, 1);
        assert_eq!(
            fs::read(dir.path().join("typestates.bin")).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_export_is_deterministic() {
        let universe = TreeUniverse::new();
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let options = ExportOptions { emit_text_dumps: true };
        BinaryExporter::new(&universe)
            .export(&sample_graph(), first.path(), &options)
            .unwrap();
        BinaryExporter::new(&universe)
            .export(&sample_graph(), second.path(), &options)
            .unwrap();
        for entry in fs::read_dir(first.path()).unwrap() {
            let entry = entry.unwrap();
            let a = fs::read(entry.path()).unwrap();
            let b = fs::read(second.path().join(entry.file_name())).unwrap();
            assert_eq!(a, b, "stream {:?} differs", entry.file_name());
        }
    }

    #[test]
    fn test_root_edge_encodes_zero_source() {
        let universe = TreeUniverse::new();
        let dir = tempdir().unwrap();
        BinaryExporter::new(&universe)
            .export(&sample_graph(), dir.path(), &ExportOptions::default())
            .unwrap();
        let bytes = fs::read(dir.path().join("direct_invokes.bin")).unwrap();
        let first_src = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        // Rows are sorted; the root row (src 0) comes first.
        assert_eq!(first_src, 0);
    }

    #[test]
    fn test_flipped_containing_sets_msb() {
        let universe = TreeUniverse::new();
        let dir = tempdir().unwrap();
        BinaryExporter::new(&universe)
            .export(&sample_graph(), dir.path(), &ExportOptions::default())
            .unwrap();
        let bytes = fs::read(dir.path().join("typeflow_methods.bin")).unwrap();
        let entries: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        // "a flow" sorts first and carries the flipped association.
        assert!(entries[0] & FLIPPED_CONTAINING_BIT != 0);
        assert!(entries[1] & FLIPPED_CONTAINING_BIT == 0);
    }

    #[test]
    fn test_type_fact_anchors_to_its_subject_type() {
        let universe = TreeUniverse::new();
        let dir = tempdir().unwrap();
        let graph = ProvenanceGraph {
            facts: vec![Fact::TypeInstantiated(TypeId(1))],
            ..ProvenanceGraph::default()
        };
        BinaryExporter::new(&universe)
            .export(&graph, dir.path(), &ExportOptions::default())
            .unwrap();
        let bytes = fs::read(dir.path().join("node_parents.bin")).unwrap();
        // Preorder [0, 1, 3, 2] gives TypeId(1) export id 2.
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 2);
    }

    #[test]
    fn test_graceful_degrade_on_missing_declaring_type() {
        let universe = TreeUniverse::new();
        let dir = tempdir().unwrap();
        let graph = ProvenanceGraph {
            facts: vec![Fact::MethodReachable(MethodId(99))],
            ..ProvenanceGraph::default()
        };
        BinaryExporter::new(&universe)
            .export(&graph, dir.path(), &ExportOptions::default())
            .unwrap();
        let bytes = fs::read(dir.path().join("node_parents.bin")).unwrap();
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 0);
    }

    #[test]
    fn test_oversized_type_universe_is_rejected() {
        let mut universe = TreeUniverse::new();
        universe.extra_types = (100..66_000).map(TypeId).collect();
        let dir = tempdir().unwrap();
        let result = BinaryExporter::new(&universe).export(
            &ProvenanceGraph::default(),
            dir.path(),
            &ExportOptions::default(),
        );
        assert!(matches!(result, Err(CausalityError::Export(_))));
    }
}
