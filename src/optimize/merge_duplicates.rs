//! Merge chunks containing exactly the same modules
//!
//! Identical anonymous async groups end up with one shared chunk this way.

use indexmap::IndexMap;
use tracing::debug;

use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::graph::ModuleId;

fn can_merge(chunk_graph: &ChunkGraph, survivor: ChunkKey, other: ChunkKey) -> bool {
    let (a, b) = (chunk_graph.chunk(survivor), chunk_graph.chunk(other));
    if a.has_entry_module() || b.has_entry_module() || a.prevent_integration || b.prevent_integration {
        return false;
    }
    if chunk_graph.has_runtime(survivor) || chunk_graph.has_runtime(other) {
        return false;
    }
    if chunk_graph.can_be_initial(survivor) != chunk_graph.can_be_initial(other) {
        return false;
    }
    match (a.name(), b.name()) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

/// Merge duplicates into the earliest chunk; returns the number removed
pub(crate) fn merge_duplicate_chunks(chunk_graph: &mut ChunkGraph) -> usize {
    let mut by_modules: IndexMap<Vec<ModuleId>, Vec<ChunkKey>> = IndexMap::new();
    for chunk in chunk_graph.chunks().filter(|c| !c.is_empty()) {
        by_modules
            .entry(chunk.modules().collect())
            .or_default()
            .push(chunk.key());
    }

    let mut merged = 0;
    for (_, chunks) in by_modules.into_iter().filter(|(_, c)| c.len() > 1) {
        let mut survivors: Vec<ChunkKey> = Vec::new();
        for chunk in chunks {
            match survivors.iter().copied().find(|&s| can_merge(chunk_graph, s, chunk)) {
                Some(survivor) => {
                    let name = chunk_graph.chunk(chunk).name().map(str::to_string);
                    chunk_graph.integrate_chunks(survivor, chunk);
                    if let Some(name) = name {
                        if chunk_graph.chunk(survivor).name().is_none() {
                            chunk_graph.set_chunk_name(survivor, name);
                        }
                    }
                    debug!("Merged duplicate chunk {} into {}", chunk, survivor);
                    merged += 1;
                }
                None => survivors.push(chunk),
            }
        }
    }
    merged
}
