//! Candidate collection for split chunks
//!
//! Every module is grouped by the exact set of chunks containing it. For each
//! matching cache group the module is added to one item per candidate chunk
//! combination: its own chunk set and every other observed chunk set that is
//! a subset of it. Chunks a cache group already produced are final and never
//! act as a source again, so they keep the size they were created with.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::cache_group::ResolvedCacheGroup;
use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::graph::{ModuleGraph, ModuleId};

/// Identity of a candidate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum ItemKey {
    Named { cache_group: usize, name: String },
    Chunks { cache_group: usize, chunks: Vec<ChunkKey> },
}

/// Modules a cache group could move out of a set of chunks
#[derive(Debug, Clone)]
pub(super) struct ChunksInfoItem {
    pub cache_group: usize,
    pub name: Option<String>,
    pub modules: BTreeSet<ModuleId>,
    pub chunks: BTreeSet<ChunkKey>,
    pub size: u64,
}

impl ChunksInfoItem {
    fn new(cache_group: usize, name: Option<String>) -> Self {
        Self {
            cache_group,
            name,
            modules: BTreeSet::new(),
            chunks: BTreeSet::new(),
            size: 0,
        }
    }

    pub fn add_module(&mut self, module: ModuleId, size: u64) {
        if self.modules.insert(module) {
            self.size += size;
        }
    }

    pub fn remove_module(&mut self, module: ModuleId, size: u64) -> bool {
        let removed = self.modules.remove(&module);
        if removed {
            self.size -= size;
        }
        removed
    }

    /// Size no longer duplicated once the item is extracted
    pub fn size_reduction(&self) -> u64 {
        self.size * (self.chunks.len().saturating_sub(1) as u64)
    }

    /// Whether request limits and `min_remaining_size` are lifted for this item
    pub fn is_enforced(&self, group: &ResolvedCacheGroup, enforce_size_threshold: u64) -> bool {
        group.enforce || self.size >= enforce_size_threshold
    }

    /// Only an explicit `enforce` lifts `min_size`
    pub fn passes_min_size(&self, group: &ResolvedCacheGroup) -> bool {
        group.enforce || self.size >= group.min_size
    }
}

/// Higher is better
pub(super) fn compare_items(
    a: &ChunksInfoItem,
    b: &ChunksInfoItem,
    groups: &[ResolvedCacheGroup],
    modules: &ModuleGraph,
) -> Ordering {
    let (ga, gb) = (&groups[a.cache_group], &groups[b.cache_group]);
    ga.priority
        .cmp(&gb.priority)
        .then_with(|| gb.index.cmp(&ga.index))
        .then_with(|| a.chunks.len().cmp(&b.chunks.len()))
        .then_with(|| a.size_reduction().cmp(&b.size_reduction()))
        .then_with(|| a.modules.len().cmp(&b.modules.len()))
        .then_with(|| {
            let ids_a = a.modules.iter().map(|m| modules.module(*m).identifier.as_str());
            let ids_b = b.modules.iter().map(|m| modules.module(*m).identifier.as_str());
            // lexically smaller module list wins
            ids_b.cmp(ids_a)
        })
}

/// Collected candidates in discovery order
pub(super) type ChunksInfoMap = IndexMap<ItemKey, ChunksInfoItem>;

/// Build the candidate map
///
/// `min_shared` limits which modules are looked at: `1` for the first
/// pass, `2` later on.
pub(super) fn collect_items(
    chunk_graph: &ChunkGraph,
    modules: &ModuleGraph,
    groups: &[ResolvedCacheGroup],
    min_shared: usize,
    matched: &mut [BTreeSet<ModuleId>],
) -> ChunksInfoMap {
    let candidates: Vec<(ModuleId, Vec<ChunkKey>)> = chunk_graph
        .chunked_modules()
        .into_iter()
        .filter(|m| !chunk_graph.is_entry_module(*m))
        .map(|m| {
            let sources = chunk_graph
                .module_chunks(m)
                .filter(|c| chunk_graph.chunk(*c).cache_group().is_none())
                .collect::<Vec<_>>();
            (m, sources)
        })
        .filter(|(_, chunks)| chunks.len() >= min_shared)
        .collect();

    let chunk_sets: BTreeSet<Vec<ChunkKey>> = candidates.iter().map(|(_, c)| c.clone()).collect();

    let mut items = ChunksInfoMap::default();
    for (module_id, chunks) in &candidates {
        let module = modules.module(*module_id);
        let own: BTreeSet<ChunkKey> = chunks.iter().copied().collect();

        let mut combinations: Vec<&Vec<ChunkKey>> = vec![chunks];
        combinations.extend(
            chunk_sets
                .iter()
                .filter(|set| set.len() < chunks.len() && set.iter().all(|c| own.contains(c))),
        );

        for group in groups {
            if !group.matches(module) {
                continue;
            }

            for combination in &combinations {
                let selected: Vec<ChunkKey> = combination
                    .iter()
                    .copied()
                    .filter(|c| group.chunks.accepts(chunk_graph, *c))
                    .collect();
                if selected.len() < group.min_chunks {
                    continue;
                }
                matched[group.index].insert(*module_id);

                let name = group
                    .name
                    .as_ref()
                    .and_then(|n| n.for_module(module, &group.key));
                let key = match &name {
                    Some(name) => ItemKey::Named {
                        cache_group: group.index,
                        name: name.clone(),
                    },
                    None => ItemKey::Chunks {
                        cache_group: group.index,
                        chunks: selected.clone(),
                    },
                };

                let item = items
                    .entry(key)
                    .or_insert_with(|| ChunksInfoItem::new(group.index, name));
                item.add_module(*module_id, module.size);
                item.chunks.extend(selected);
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_chunk_graph, BuildOptions};
    use crate::graph::{Entry, Module};
    use crate::optimize::split_chunks::cache_group::{CacheGroup, ChunkFilter, SplitChunksOptions};
    use pretty_assertions::assert_eq;

    fn three_entries() -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js")).unwrap();
        let y = graph.add_module(Module::new("./y.js")).unwrap();
        let z = graph.add_module(Module::new("./z.js")).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(10)).unwrap();
        let t = graph.add_module(Module::new("./t.js").with_size(5)).unwrap();
        for entry in [x, y, z] {
            graph.add_sync_dependency(entry, s).unwrap();
        }
        graph.add_sync_dependency(x, t).unwrap();
        graph.add_sync_dependency(y, t).unwrap();
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();
        graph.add_entry(Entry::new("z", z)).unwrap();
        graph
    }

    #[test]
    fn test_items_include_subset_combinations() {
        let graph = three_entries();
        let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let options = SplitChunksOptions {
            min_size: 0,
            cache_groups: vec![CacheGroup::new("shared").chunks(ChunkFilter::All).min_chunks(2)],
            ..Default::default()
        };
        let groups = options.resolve_cache_groups(&[]);
        let mut matched = vec![BTreeSet::new(); groups.len()];

        let items = collect_items(&cg, &graph, &groups, 1, &mut matched);
        let mut summary: Vec<(usize, Vec<String>)> = items
            .values()
            .map(|item| {
                (
                    item.chunks.len(),
                    item.modules
                        .iter()
                        .map(|m| graph.module(*m).identifier.clone())
                        .collect(),
                )
            })
            .collect();
        summary.sort();

        // s is also offered to the {x, y} combination that t lives in
        assert_eq!(
            summary,
            vec![
                (2, vec!["./s.js".to_string(), "./t.js".to_string()]),
                (3, vec!["./s.js".to_string()]),
            ]
        );
        assert_eq!(matched[0].len(), 2);
    }

    #[test]
    fn test_entry_modules_and_filtered_chunks_are_skipped() {
        let graph = three_entries();
        let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let options = SplitChunksOptions {
            min_size: 0,
            cache_groups: vec![CacheGroup::new("async-only").chunks(ChunkFilter::Async).min_chunks(1)],
            ..Default::default()
        };
        let groups = options.resolve_cache_groups(&[]);
        let mut matched = vec![BTreeSet::new(); groups.len()];

        let items = collect_items(&cg, &graph, &groups, 1, &mut matched);
        assert!(items.is_empty());
    }

    #[test]
    fn test_cache_group_chunks_are_not_sources() {
        let graph = three_entries();
        let mut cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let x_chunk = cg.group(cg.entrypoint("x").unwrap()).entrypoint_chunk().unwrap();
        cg.chunk_mut(x_chunk).cache_group = Some("earlier".to_string());

        let options = SplitChunksOptions {
            min_size: 0,
            cache_groups: vec![CacheGroup::new("shared").min_chunks(2)],
            ..Default::default()
        };
        let groups = options.resolve_cache_groups(&[]);
        let mut matched = vec![BTreeSet::new(); groups.len()];

        let items = collect_items(&cg, &graph, &groups, 1, &mut matched);
        assert_eq!(items.len(), 1);
        let item = items.values().next().unwrap();
        assert_eq!(item.chunks.len(), 2);
        assert!(!item.chunks.contains(&x_chunk));
        assert_eq!(item.modules.len(), 1);
    }

    #[test]
    fn test_compare_prefers_priority_then_declaration() {
        let graph = three_entries();
        let groups = SplitChunksOptions {
            cache_groups: vec![
                CacheGroup::new("a").priority(1),
                CacheGroup::new("b").priority(1),
                CacheGroup::new("c").priority(2),
            ],
            ..Default::default()
        }
        .resolve_cache_groups(&[]);

        let item = |cache_group| {
            let mut item = ChunksInfoItem::new(cache_group, None);
            item.add_module(ModuleId::from_index(3), 10);
            item
        };
        assert_eq!(compare_items(&item(0), &item(1), &groups, &graph), Ordering::Greater);
        assert_eq!(compare_items(&item(0), &item(2), &groups, &graph), Ordering::Less);
    }
}
