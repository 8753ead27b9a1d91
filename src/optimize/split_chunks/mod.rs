//! Split chunks
//!
//! Moves modules shared by several chunks (or matched by a cache group) into
//! dedicated chunks. Candidates are collected per cache group and chunk
//! combination, then extracted best-first until none are left. The whole
//! pass repeats while it keeps lowering the number of module placements.

mod cache_group;
mod chunks_info;
mod max_size;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Instant;

use tracing::{debug, info, trace};

use crate::chunk_graph::{ChunkGraph, ChunkGroupKey, ChunkKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::graph::{ModuleGraph, ModuleId};
use crate::utils::format_duration;

pub use cache_group::{
    default_cache_groups, CacheGroup, CacheGroupEffect, ChunkFilter, ChunkName, ModuleTest, ResolvedCacheGroup,
    SplitChunksOptions,
};

use chunks_info::{collect_items, compare_items, ChunksInfoItem, ChunksInfoMap, ItemKey};
use max_size::{split_oversized_chunk, SizeLimits};

/// What a split chunks run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitChunksReport {
    pub passes: usize,
    pub chunks_created: usize,
    pub max_size_parts: usize,
}

pub struct SplitChunks<'a> {
    modules: &'a ModuleGraph,
    options: &'a SplitChunksOptions,
    groups: Vec<ResolvedCacheGroup>,
    /// Per cache group: modules that produced a candidate
    matched: Vec<BTreeSet<ModuleId>>,
    /// Per cache group: whether it moved anything
    produced: Vec<bool>,
}

impl<'a> SplitChunks<'a> {
    /// `extra` cache groups are registered after the configured ones
    pub fn new(modules: &'a ModuleGraph, options: &'a SplitChunksOptions, extra: &[CacheGroup]) -> Self {
        let groups = options.resolve_cache_groups(extra);
        let count = groups.len();
        Self {
            modules,
            options,
            groups,
            matched: vec![BTreeSet::new(); count],
            produced: vec![false; count],
        }
    }

    pub fn cache_groups(&self) -> &[ResolvedCacheGroup] {
        &self.groups
    }

    pub fn run(mut self, chunk_graph: &mut ChunkGraph) -> SplitChunksReport {
        let start = Instant::now();
        let mut report = SplitChunksReport::default();

        loop {
            report.passes += 1;
            let before = placements(chunk_graph);
            let min_shared = if report.passes == 1 { 1 } else { 2 };

            let items = collect_items(chunk_graph, self.modules, &self.groups, min_shared, &mut self.matched);
            trace!("Split chunks pass {}: {} candidates", report.passes, items.len());
            report.chunks_created += self.apply_items(chunk_graph, items);

            let after = placements(chunk_graph);
            if after >= before || report.passes >= self.options.max_passes.max(1) {
                break;
            }
        }

        report.max_size_parts = self.apply_max_size(chunk_graph);

        for group in &self.groups {
            let matched = self.matched[group.index].len();
            if matched > 0 && !self.produced[group.index] {
                chunk_graph.push_diagnostic(Diagnostic::info(DiagnosticKind::UnsatisfiedCacheGroup {
                    cache_group: group.key.clone(),
                    modules: matched,
                }));
            }
        }

        info!(
            "Split chunks created {} chunks ({} max size parts) in {} passes",
            report.chunks_created, report.max_size_parts, report.passes
        );
        debug!("Split chunks finished in {}", format_duration(start.elapsed()));
        report
    }

    fn best_item(&self, items: &ChunksInfoMap) -> Option<ItemKey> {
        let mut best: Option<(&ItemKey, &ChunksInfoItem)> = None;
        for (key, item) in items {
            match best {
                Some((_, current)) if compare_items(item, current, &self.groups, self.modules) != Ordering::Greater => {}
                _ => best = Some((key, item)),
            }
        }
        best.map(|(key, _)| key.clone())
    }

    fn passes_min_size(&self, item: &ChunksInfoItem) -> bool {
        item.passes_min_size(&self.groups[item.cache_group])
    }

    /// Extract items best-first; returns the number of chunks created
    fn apply_items(&mut self, chunk_graph: &mut ChunkGraph, mut items: ChunksInfoMap) -> usize {
        items.retain(|_, item| self.passes_min_size(item));
        let mut created = 0;

        while let Some(key) = self.best_item(&items) {
            let Some(item) = items.shift_remove(&key) else {
                break;
            };
            let group = &self.groups[item.cache_group];
            let enforced = item.is_enforced(group, self.options.enforce_size_threshold);

            // Resolve the chunk receiving the modules
            let mut target: Option<ChunkKey> = None;
            if let Some(name) = &item.name {
                if let Some(existing) = chunk_graph.named_chunk(name) {
                    if is_entrypoint_chunk(chunk_graph, existing) {
                        chunk_graph.push_diagnostic(Diagnostic::warning(
                            DiagnosticKind::CacheGroupConflictsWithEntrypoint {
                                cache_group: group.key.clone(),
                                name: name.clone(),
                            },
                        ));
                        continue;
                    }
                    target = Some(existing);
                }
            } else if group.reuse_existing_chunk {
                target = item.chunks.iter().copied().find(|&c| {
                    let chunk = chunk_graph.chunk(c);
                    chunk.len() == item.modules.len()
                        && item.modules.iter().all(|m| chunk.contains_module(*m))
                        && !(item.chunks.len() > 1 && chunk.has_entry_module())
                        && !chunk.prevent_integration
                });
            }

            let candidates: Vec<ChunkKey> = item
                .chunks
                .iter()
                .copied()
                .filter(|c| Some(*c) != target)
                .collect();
            let mut used: BTreeSet<ChunkKey> = candidates
                .iter()
                .copied()
                .filter(|&c| {
                    chunk_graph.get_chunk(c).is_some()
                        && item.modules.iter().any(|m| chunk_graph.is_module_in_chunk(*m, c))
                })
                .collect();

            if !enforced {
                used.retain(|&c| chunk_graph.requests(c) < max_requests(chunk_graph, c, group));
            }

            if used.len() < candidates.len() {
                // Some chunks dropped out; retry with the ones left
                let target_counts = target.is_some_and(|t| item.chunks.contains(&t)) as usize;
                if !used.is_empty() && used.len() + target_counts >= group.min_chunks {
                    let mut chunks = used.clone();
                    if let Some(t) = target.filter(|t| item.chunks.contains(t)) {
                        chunks.insert(t);
                    }
                    self.requeue(&mut items, item, chunks);
                }
                continue;
            }

            if used.is_empty() {
                continue;
            }

            if !enforced && used.len() == 1 && group.min_remaining_size > 0 {
                let chunk = used.iter().next().copied().map(|c| chunk_graph.chunk(c));
                let remaining: u64 = chunk
                    .map(|c| {
                        c.modules()
                            .filter(|m| !item.modules.contains(m))
                            .map(|m| self.modules.module(m).size)
                            .sum()
                    })
                    .unwrap_or(0);
                if remaining > 0 && remaining < group.min_remaining_size {
                    trace!("Skipping {}: {} bytes would remain", group.key, remaining);
                    continue;
                }
            }

            let movable = movable_modules(chunk_graph, &item, &used, target);
            if movable.is_empty() {
                continue;
            }
            if target.is_none() && !group.enforce {
                let size: u64 = movable.iter().map(|m| self.modules.module(*m).size).sum();
                if size < group.min_size {
                    trace!("Skipping {}: only {} of {} bytes can move", group.key, size, item.size);
                    continue;
                }
            }

            let new_chunk = match target {
                Some(chunk) => chunk,
                None => {
                    created += 1;
                    chunk_graph.add_chunk(item.name.clone())
                }
            };

            for &chunk in &used {
                chunk_graph.split_chunk(chunk, new_chunk);
            }
            {
                let chunk = chunk_graph.chunk_mut(new_chunk);
                chunk.id_name_hints.insert(group.id_hint.clone());
                if chunk.cache_group.is_none() {
                    chunk.cache_group = Some(group.key.clone());
                }
                if chunk.filename_template.is_none() {
                    chunk.filename_template = group.filename.clone();
                }
            }
            for &module in &movable {
                for &chunk in &used {
                    chunk_graph.disconnect_chunk_and_module(chunk, module);
                }
                chunk_graph.connect_chunk_and_module(new_chunk, module);
            }
            self.produced[item.cache_group] = true;

            debug!(
                "Cache group {} moved {} modules from {} chunks into {}",
                group.key,
                movable.len(),
                used.len(),
                new_chunk
            );

            // Moved modules are gone from overlapping candidates
            let modules = self.modules;
            let groups = &self.groups;
            items.retain(|_, other| {
                if other.chunks.iter().any(|c| used.contains(c)) {
                    for module in &movable {
                        other.remove_module(*module, modules.module(*module).size);
                    }
                }
                !other.modules.is_empty() && other.passes_min_size(&groups[other.cache_group])
            });
        }

        created
    }

    fn requeue(&self, items: &mut ChunksInfoMap, item: ChunksInfoItem, chunks: BTreeSet<ChunkKey>) {
        let key = match &item.name {
            Some(name) => ItemKey::Named {
                cache_group: item.cache_group,
                name: name.clone(),
            },
            None => ItemKey::Chunks {
                cache_group: item.cache_group,
                chunks: chunks.iter().copied().collect(),
            },
        };
        let requeued = items.entry(key.clone()).or_insert_with(|| ChunksInfoItem {
            cache_group: item.cache_group,
            name: item.name.clone(),
            modules: BTreeSet::new(),
            chunks: BTreeSet::new(),
            size: 0,
        });
        for module in &item.modules {
            requeued.add_module(*module, self.modules.module(*module).size);
        }
        requeued.chunks.extend(chunks);

        if !self.passes_min_size(requeued) {
            items.shift_remove(&key);
        }
    }

    /// Subdivide chunks above their max size; returns the parts created
    fn apply_max_size(&self, chunk_graph: &mut ChunkGraph) -> usize {
        let mut created = 0;
        for key in chunk_graph.chunk_keys() {
            let group = chunk_graph
                .chunk(key)
                .cache_group()
                .and_then(|name| self.groups.iter().find(|g| g.key == name));
            let (max_size, min_size) = match group {
                Some(group) => (group.max_size, group.min_size),
                None => (self.options.fallback_max_size, self.options.min_size),
            };
            let Some(max_size) = max_size else {
                continue;
            };
            if chunk_graph.chunk_size(key, self.modules) <= max_size {
                continue;
            }
            let limits = SizeLimits {
                min_size: min_size.min(max_size),
                max_size,
            };
            created += split_oversized_chunk(
                chunk_graph,
                self.modules,
                key,
                limits,
                &self.options.automatic_name_delimiter,
            )
            .len();
        }
        created
    }
}

/// Run split chunks with the configured cache groups plus `extra`
pub fn split_chunks(
    chunk_graph: &mut ChunkGraph,
    modules: &ModuleGraph,
    options: &SplitChunksOptions,
    extra: &[CacheGroup],
) -> SplitChunksReport {
    SplitChunks::new(modules, options, extra).run(chunk_graph)
}

fn placements(chunk_graph: &ChunkGraph) -> usize {
    chunk_graph.chunks().map(|c| c.len()).sum()
}

fn is_entrypoint_chunk(chunk_graph: &ChunkGraph, chunk: ChunkKey) -> bool {
    chunk_graph.chunk(chunk).has_entry_module()
        || chunk_graph
            .groups()
            .any(|g| g.entrypoint_chunk() == Some(chunk))
}

fn max_requests(chunk_graph: &ChunkGraph, chunk: ChunkKey, group: &ResolvedCacheGroup) -> usize {
    if chunk_graph.is_only_initial(chunk) {
        group.max_initial_requests
    } else if chunk_graph.can_be_initial(chunk) {
        group.max_initial_requests.min(group.max_async_requests)
    } else {
        group.max_async_requests
    }
}

/// Item modules that can move without appearing twice in one group
fn movable_modules(
    chunk_graph: &ChunkGraph,
    item: &ChunksInfoItem,
    used: &BTreeSet<ChunkKey>,
    target: Option<ChunkKey>,
) -> Vec<ModuleId> {
    let mut groups: BTreeSet<ChunkGroupKey> = used.iter().flat_map(|c| chunk_graph.chunk(*c).groups()).collect();
    if let Some(target) = target {
        groups.extend(chunk_graph.chunk(target).groups());
    }

    item.modules
        .iter()
        .copied()
        .filter(|&module| {
            groups.iter().all(|&group| {
                chunk_graph.group(group).chunks().iter().all(|&c| {
                    Some(c) == target || used.contains(&c) || !chunk_graph.is_module_in_chunk(module, c)
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_chunk_graph, BuildOptions};
    use crate::graph::{Entry, Module};
    use pretty_assertions::assert_eq;

    fn shared_entries(shared_size: u64) -> (ModuleGraph, ModuleId) {
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js").with_size(10)).unwrap();
        let y = graph.add_module(Module::new("./y.js").with_size(10)).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(shared_size)).unwrap();
        graph.add_sync_dependency(x, s).unwrap();
        graph.add_sync_dependency(y, s).unwrap();
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();
        (graph, s)
    }

    fn options(groups: Vec<CacheGroup>) -> SplitChunksOptions {
        SplitChunksOptions {
            min_size: 0,
            cache_groups: groups,
            ..Default::default()
        }
    }

    fn run(graph: &ModuleGraph, options: &SplitChunksOptions) -> (ChunkGraph, SplitChunksReport) {
        let mut cg = build_chunk_graph(graph, BuildOptions::default()).unwrap();
        let report = split_chunks(&mut cg, graph, options, &[]);
        assert_eq!(cg.check_invariants(), Vec::<String>::new());
        (cg, report)
    }

    #[test]
    fn test_two_entries_share_module() {
        let (graph, s) = shared_entries(10);
        let (cg, report) = run(
            &graph,
            &options(vec![CacheGroup::new("shared").chunks(ChunkFilter::All).min_chunks(2)]),
        );

        assert_eq!(report.chunks_created, 1);
        let shared: Vec<ChunkKey> = cg.module_chunks(s).collect();
        assert_eq!(shared.len(), 1);
        for name in ["x", "y"] {
            let group = cg.group(cg.entrypoint(name).unwrap());
            let entry_chunk = group.entrypoint_chunk().unwrap();
            assert!(!cg.is_module_in_chunk(s, entry_chunk));
            assert_eq!(group.chunks(), &[shared[0], entry_chunk]);
        }
        assert_eq!(cg.chunk(shared[0]).cache_group(), Some("shared"));
        assert_eq!(cg.chunk(shared[0]).runtime().to_string(), "x|y");
    }

    #[test]
    fn test_min_size_keeps_modules_in_place() {
        let (graph, s) = shared_entries(10);
        let mut opts = options(vec![CacheGroup::new("shared").chunks(ChunkFilter::All).min_chunks(2)]);
        opts.min_size = 1000;
        let (cg, report) = run(&graph, &opts);

        assert_eq!(report.chunks_created, 0);
        assert_eq!(cg.module_chunk_count(s), 2);
        assert!(cg.diagnostics().iter().any(|d| matches!(
            &d.kind,
            DiagnosticKind::UnsatisfiedCacheGroup { cache_group, .. } if cache_group == "shared"
        )));
    }

    #[test]
    fn test_enforce_ignores_global_min_size() {
        let (graph, s) = shared_entries(10);
        let mut opts = options(vec![CacheGroup::new("shared")
            .chunks(ChunkFilter::All)
            .min_chunks(2)
            .enforce(true)]);
        opts.min_size = 1000;
        let (cg, _) = run(&graph, &opts);
        assert_eq!(cg.module_chunk_count(s), 1);
    }

    #[test]
    fn test_enforce_size_threshold_keeps_min_size() {
        let (graph, s) = shared_entries(60_000);
        let mut opts = options(vec![CacheGroup::new("shared").min_chunks(2)]);
        opts.min_size = 100_000;
        let (cg, report) = run(&graph, &opts);
        assert_eq!(report.chunks_created, 0);
        assert_eq!(cg.module_chunk_count(s), 2);
    }

    #[test]
    fn test_enforce_size_threshold_lifts_request_limits() {
        let (graph, s) = shared_entries(60_000);
        let group = CacheGroup::new("shared")
            .min_chunks(2)
            .effect(CacheGroupEffect::MaxInitialRequests(1));
        let (cg, report) = run(&graph, &options(vec![group]));
        assert_eq!(report.chunks_created, 1);
        assert_eq!(cg.module_chunk_count(s), 1);
    }

    #[test]
    fn test_min_size_checked_on_modules_that_can_move() {
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js")).unwrap();
        let y = graph.add_module(Module::new("./y.js")).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(60)).unwrap();
        let t = graph.add_module(Module::new("./t.js").with_size(60)).unwrap();
        for entry in [x, y] {
            graph.add_sync_dependency(entry, s).unwrap();
            graph.add_sync_dependency(entry, t).unwrap();
        }
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();

        // s also sits in a second chunk of y, so only t may leave {x, y}
        let mut cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let y_group = cg.entrypoint("y").unwrap();
        let extra = cg.add_chunk(None);
        cg.connect_chunk_and_group(extra, y_group);
        cg.connect_chunk_and_module(extra, s);

        let mut opts = options(vec![CacheGroup::new("shared").min_chunks(2)]);
        opts.min_size = 100;
        let report = split_chunks(&mut cg, &graph, &opts, &[]);

        assert_eq!(report.chunks_created, 0);
        assert_eq!(cg.module_chunk_count(t), 2);
        assert_eq!(cg.module_chunk_count(s), 3);
    }

    #[test]
    fn test_bare_cache_group_takes_initial_chunks() {
        let (graph, s) = shared_entries(10);
        let (cg, report) = run(&graph, &options(vec![CacheGroup::new("shared").min_chunks(2)]));
        assert_eq!(report.chunks_created, 1);
        assert_eq!(cg.module_chunk_count(s), 1);
    }

    #[test]
    fn test_higher_priority_wins() {
        let (graph, s) = shared_entries(10);
        let (cg, _) = run(
            &graph,
            &options(vec![
                CacheGroup::new("low").chunks(ChunkFilter::All).min_chunks(2).name("low"),
                CacheGroup::new("high")
                    .chunks(ChunkFilter::All)
                    .min_chunks(2)
                    .priority(10)
                    .name("high"),
            ]),
        );
        let chunk = cg.named_chunk("high").unwrap();
        assert!(cg.is_module_in_chunk(s, chunk));
        assert_eq!(cg.named_chunk("low"), None);
    }

    #[test]
    fn test_equal_priority_first_declared_wins() {
        let (graph, s) = shared_entries(10);
        let (cg, _) = run(
            &graph,
            &options(vec![
                CacheGroup::new("first").chunks(ChunkFilter::All).min_chunks(2).name("first"),
                CacheGroup::new("second").chunks(ChunkFilter::All).min_chunks(2).name("second"),
            ]),
        );
        assert!(cg.is_module_in_chunk(s, cg.named_chunk("first").unwrap()));
        assert_eq!(cg.named_chunk("second"), None);
    }

    #[test]
    fn test_reuse_existing_chunk() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module(Module::new("./main.js")).unwrap();
        let lazy = graph.add_module(Module::new("./lazy.js").with_size(10)).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(10)).unwrap();
        graph.add_dynamic_import(main, lazy, None).unwrap();
        graph.add_dynamic_import(main, s, None).unwrap();
        graph.add_sync_dependency(lazy, s).unwrap();
        graph.add_entry(Entry::new("main", main)).unwrap();

        let before = build_chunk_graph(&graph, BuildOptions::default()).unwrap().chunk_count();
        let (cg, report) = run(
            &graph,
            &options(vec![CacheGroup::new("shared").min_chunks(2).reuse_existing_chunk(true)]),
        );

        assert_eq!(report.chunks_created, 0);
        assert_eq!(cg.chunk_count(), before);
        let s_chunk = cg.module_chunks(s).next().unwrap();
        let lazy_chunk = cg.module_chunks(lazy).next().unwrap();
        assert_eq!(cg.module_chunk_count(s), 1);
        let lazy_group = cg.chunk(lazy_chunk).groups().next().unwrap();
        assert_eq!(cg.group(lazy_group).chunks(), &[s_chunk, lazy_chunk]);
    }

    #[test]
    fn test_max_initial_requests_blocks_split() {
        let (graph, s) = shared_entries(10);
        let group = CacheGroup::new("shared")
            .chunks(ChunkFilter::All)
            .min_chunks(2)
            .effect(CacheGroupEffect::MaxInitialRequests(1));
        let (cg, _) = run(&graph, &options(vec![group.clone()]));
        assert_eq!(cg.module_chunk_count(s), 2);

        let (cg, _) = run(&graph, &options(vec![group.enforce(true)]));
        assert_eq!(cg.module_chunk_count(s), 1);
    }

    #[test]
    fn test_name_conflicting_with_entrypoint_is_skipped() {
        let (graph, s) = shared_entries(10);
        let (cg, report) = run(
            &graph,
            &options(vec![CacheGroup::new("shared").chunks(ChunkFilter::All).min_chunks(2).name("x")]),
        );
        assert_eq!(report.chunks_created, 0);
        assert_eq!(cg.module_chunk_count(s), 2);
        assert!(cg.diagnostics().warnings().any(|d| matches!(
            d.kind,
            DiagnosticKind::CacheGroupConflictsWithEntrypoint { .. }
        )));
    }

    #[test]
    fn test_min_remaining_size_protects_single_chunk() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module(Module::new("./main.js")).unwrap();
        let lazy = graph.add_module(Module::new("./lazy.js").with_size(10)).unwrap();
        let vendor = graph.add_module(Module::new("./node_modules/lib/index.js").with_size(50)).unwrap();
        graph.add_dynamic_import(main, lazy, None).unwrap();
        graph.add_sync_dependency(lazy, vendor).unwrap();
        graph.add_entry(Entry::new("main", main)).unwrap();

        let vendors = CacheGroup::new("vendors")
            .test(ModuleTest::regex("node_modules").unwrap())
            .effect(CacheGroupEffect::MinRemainingSize(20));
        let (cg, _) = run(&graph, &options(vec![vendors.clone()]));
        assert_eq!(cg.module_chunks(vendor).next(), cg.module_chunks(lazy).next());

        let (cg, _) = run(&graph, &options(vec![vendors.effect(CacheGroupEffect::MinRemainingSize(5))]));
        assert_ne!(cg.module_chunks(vendor).next(), cg.module_chunks(lazy).next());
    }

    #[test]
    fn test_max_size_subdivides_shared_chunk() {
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js")).unwrap();
        let y = graph.add_module(Module::new("./y.js")).unwrap();
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();
        for path in ["./lib/a/one.js", "./lib/a/two.js", "./lib/b/one.js", "./lib/b/two.js"] {
            let m = graph.add_module(Module::new(path).with_size(40)).unwrap();
            graph.add_sync_dependency(x, m).unwrap();
            graph.add_sync_dependency(y, m).unwrap();
        }

        let (cg, report) = run(
            &graph,
            &options(vec![CacheGroup::new("shared")
                .chunks(ChunkFilter::All)
                .min_chunks(2)
                .name("shared")
                .max_size(100)]),
        );

        assert_eq!(report.max_size_parts, 1);
        let shared: Vec<_> = cg.chunks().filter(|c| c.cache_group() == Some("shared")).collect();
        assert_eq!(shared.len(), 2);
        for chunk in &shared {
            assert!(cg.chunk_size(chunk.key(), &graph) <= 100);
        }
        assert!(shared.iter().any(|c| c.name().is_some_and(|n| n.starts_with("shared~"))));
    }

    #[test]
    fn test_default_groups_split_vendors() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module(Module::new("./main.js")).unwrap();
        let lazy = graph.add_module(Module::new("./lazy.js").with_size(25_000)).unwrap();
        let react = graph.add_module(Module::new("./node_modules/react/index.js").with_size(30_000)).unwrap();
        graph.add_sync_dependency(main, react).unwrap();
        graph.add_dynamic_import(main, lazy, None).unwrap();
        let chart = graph.add_module(Module::new("./node_modules/chart/index.js").with_size(30_000)).unwrap();
        graph.add_sync_dependency(lazy, chart).unwrap();
        graph.add_entry(Entry::new("main", main)).unwrap();

        let (cg, report) = run(&graph, &SplitChunksOptions::default());
        assert_eq!(report.chunks_created, 2);
        let main_chunk = cg.group(cg.entrypoint("main").unwrap()).entrypoint_chunk().unwrap();
        for vendor in [react, chart] {
            let chunk = cg.module_chunks(vendor).next().unwrap();
            assert!(cg.chunk(chunk).id_name_hints().any(|h| h == "vendors"));
        }
        assert!(!cg.is_module_in_chunk(react, main_chunk));

        // async filtering leaves the initial chunk alone
        let async_only = SplitChunksOptions {
            chunks: ChunkFilter::Async,
            ..Default::default()
        };
        let (cg, report) = run(&graph, &async_only);
        assert_eq!(report.chunks_created, 1);
        assert!(cg.is_module_in_chunk(react, main_chunk));
    }
}
