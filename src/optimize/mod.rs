//! Chunk graph optimization passes
//!
//! Passes run in a fixed order on an owned graph:
//! remove empty chunks, merge duplicate chunks, split chunks, and remove
//! empty chunks again. None of them can fail or lose reachability.

mod merge_duplicates;
mod remove_empty;
pub mod split_chunks;

use std::time::Instant;

use tracing::{debug, info};

use crate::chunk_graph::ChunkGraph;
use crate::graph::ModuleGraph;
use crate::utils::format_duration;

pub use split_chunks::{
    default_cache_groups, CacheGroup, CacheGroupEffect, ChunkFilter, ChunkName, ModuleTest, SplitChunksOptions,
    SplitChunksReport,
};

#[derive(Debug, Clone)]
pub struct OptimizationOptions {
    pub remove_empty_chunks: bool,
    pub merge_duplicate_chunks: bool,
    /// `None` disables split chunks
    pub split_chunks: Option<SplitChunksOptions>,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            remove_empty_chunks: true,
            merge_duplicate_chunks: true,
            split_chunks: Some(SplitChunksOptions::default()),
        }
    }
}

/// Summary of one optimization run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationReport {
    pub empty_chunks_removed: usize,
    pub duplicate_chunks_merged: usize,
    pub split_chunks: Option<SplitChunksReport>,
}

pub struct Optimizer<'a> {
    modules: &'a ModuleGraph,
    options: &'a OptimizationOptions,
    extra_cache_groups: Vec<CacheGroup>,
}

impl<'a> Optimizer<'a> {
    pub fn new(modules: &'a ModuleGraph, options: &'a OptimizationOptions) -> Self {
        Self {
            modules,
            options,
            extra_cache_groups: Vec::new(),
        }
    }

    /// Cache groups registered after the configured ones (plugins)
    pub fn with_cache_groups(mut self, groups: Vec<CacheGroup>) -> Self {
        self.extra_cache_groups.extend(groups);
        self
    }

    pub fn optimize(&self, mut chunk_graph: ChunkGraph) -> (ChunkGraph, OptimizationReport) {
        let start = Instant::now();
        let mut report = OptimizationReport::default();

        if self.options.remove_empty_chunks {
            report.empty_chunks_removed += remove_empty::remove_empty_chunks(&mut chunk_graph);
        }
        if self.options.merge_duplicate_chunks {
            report.duplicate_chunks_merged = merge_duplicates::merge_duplicate_chunks(&mut chunk_graph);
        }
        if let Some(split) = &self.options.split_chunks {
            report.split_chunks = Some(split_chunks::split_chunks(
                &mut chunk_graph,
                self.modules,
                split,
                &self.extra_cache_groups,
            ));
        }
        if self.options.remove_empty_chunks {
            report.empty_chunks_removed += remove_empty::remove_empty_chunks(&mut chunk_graph);
        }

        info!(
            "Optimized chunk graph: {} chunks ({} empty removed, {} duplicates merged)",
            chunk_graph.chunk_count(),
            report.empty_chunks_removed,
            report.duplicate_chunks_merged
        );
        debug!("Optimization finished in {}", format_duration(start.elapsed()));

        (chunk_graph, report)
    }
}

/// Run every enabled pass without extra cache groups
pub fn optimize_chunk_graph(
    chunk_graph: ChunkGraph,
    modules: &ModuleGraph,
    options: &OptimizationOptions,
) -> ChunkGraph {
    Optimizer::new(modules, options).optimize(chunk_graph).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_chunk_graph, BuildOptions};
    use crate::graph::{Entry, Module};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_leaves_no_empty_chunks() {
        // lazy only contains the shared module, so it is emptied by the split
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js")).unwrap();
        let y = graph.add_module(Module::new("./y.js")).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(10)).unwrap();
        graph.add_dynamic_import(x, s, None).unwrap();
        graph.add_dynamic_import(y, s, None).unwrap();
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();

        let options = OptimizationOptions {
            merge_duplicate_chunks: false,
            split_chunks: Some(SplitChunksOptions {
                min_size: 0,
                cache_groups: vec![CacheGroup::new("shared").min_chunks(2)],
                ..Default::default()
            }),
            ..Default::default()
        };
        let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let (cg, report) = Optimizer::new(&graph, &options).optimize(cg);

        assert_eq!(report.empty_chunks_removed, 2);
        assert_eq!(cg.chunk_count(), 3);
        assert!(cg.chunks().all(|c| !c.is_empty()));
        assert_eq!(cg.module_chunk_count(s), 1);
        assert!(cg.check_invariants().is_empty());
    }

    #[test]
    fn test_merge_runs_before_split() {
        let mut graph = ModuleGraph::new();
        let x = graph.add_module(Module::new("./x.js")).unwrap();
        let y = graph.add_module(Module::new("./y.js")).unwrap();
        let s = graph.add_module(Module::new("./s.js").with_size(10)).unwrap();
        graph.add_dynamic_import(x, s, None).unwrap();
        graph.add_dynamic_import(y, s, None).unwrap();
        graph.add_entry(Entry::new("x", x)).unwrap();
        graph.add_entry(Entry::new("y", y)).unwrap();

        let cg = build_chunk_graph(&graph, BuildOptions::default()).unwrap();
        let (cg, report) = Optimizer::new(&graph, &OptimizationOptions::default()).optimize(cg);

        assert_eq!(report.duplicate_chunks_merged, 1);
        assert_eq!(cg.chunk_count(), 3);
        assert_eq!(cg.module_chunk_count(s), 1);
    }
}
