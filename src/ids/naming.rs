//! Stable names and orderings fed to the id policies

use std::cmp::Reverse;

use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::graph::{ModuleGraph, ModuleId};
use crate::utils::{sanitize_name, ContentHasher};

use super::IdPolicy;

const MAX_DERIVED_NAME: usize = 100;

/// Name used for module ids and records
pub(crate) fn module_name(modules: &ModuleGraph, module: ModuleId) -> String {
    modules.module(module).readable_name().to_string()
}

/// Chunk name, or one derived from id hints and module names
pub(crate) fn chunk_name(chunk_graph: &ChunkGraph, modules: &ModuleGraph, key: ChunkKey) -> String {
    let chunk = chunk_graph.chunk(key);
    if let Some(name) = chunk.name() {
        return name.to_string();
    }

    let mut hints: Vec<&str> = chunk.id_name_hints().collect();
    hints.sort_unstable();
    hints.dedup();

    let mut module_names: Vec<&str> = chunk.modules().map(|m| modules.module(m).readable_name()).collect();
    module_names.sort_unstable();

    let mut parts: Vec<String> = hints.into_iter().map(str::to_string).collect();
    parts.extend(module_names.into_iter().map(sanitize_name));
    parts.retain(|p| !p.is_empty());
    if parts.is_empty() {
        return format!("chunk{}", key.index());
    }

    shorten(parts.join("-"))
}

fn shorten(name: String) -> String {
    if name.len() <= MAX_DERIVED_NAME {
        return name;
    }
    let mut hasher = ContentHasher::new();
    hasher.update(&name);
    let mut cut = MAX_DERIVED_NAME - 9;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}_{}", &name[..cut], hasher.digest(8))
}

/// Modules in the order sequential policies hand out numbers
pub(crate) fn ordered_modules(
    chunk_graph: &ChunkGraph,
    modules: &ModuleGraph,
    policy: IdPolicy,
) -> Vec<(ModuleId, String)> {
    let mut ordered: Vec<ModuleId> = chunk_graph.chunked_modules();
    if policy == IdPolicy::Size {
        let incoming = modules.incoming_counts();
        ordered.sort_by_key(|m| {
            (
                Reverse(chunk_graph.module_chunk_count(*m)),
                Reverse(incoming[m.index()]),
                modules.module(*m).identifier.clone(),
            )
        });
    }
    ordered
        .into_iter()
        .map(|m| (m, module_name(modules, m)))
        .collect()
}

/// Chunks in the order sequential policies hand out numbers
pub(crate) fn ordered_chunks(
    chunk_graph: &ChunkGraph,
    modules: &ModuleGraph,
    policy: IdPolicy,
) -> Vec<(ChunkKey, String)> {
    let mut ordered: Vec<(ChunkKey, String)> = chunk_graph
        .chunk_keys()
        .into_iter()
        .map(|c| (c, chunk_name(chunk_graph, modules, c)))
        .collect();
    if policy == IdPolicy::Size {
        ordered.sort_by_cached_key(|(c, name)| {
            let chunk = chunk_graph.chunk(*c);
            (
                Reverse(chunk.groups().count()),
                Reverse(chunk_graph.can_be_initial(*c)),
                Reverse(chunk.len()),
                name.clone(),
            )
        });
    }
    ordered
}
