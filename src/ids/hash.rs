//! Module, chunk and full hashes
//!
//! All inputs are sorted before hashing so the digests only depend on graph
//! contents, never on insertion order.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::Id;
use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::graph::{DependencyKind, ModuleGraph, ModuleId};
use crate::utils::ContentHasher;

pub(crate) fn module_hash(modules: &ModuleGraph, module: ModuleId, len: usize) -> String {
    let m = modules.module(module);
    let mut deps: Vec<&str> = m
        .dependencies()
        .iter()
        .filter(|d| d.active && d.kind == DependencyKind::Sync && d.block.is_none())
        .map(|d| modules.module(d.target).identifier.as_str())
        .collect();
    deps.sort_unstable();
    deps.dedup();

    let mut hasher = ContentHasher::new();
    hasher.update(&m.identifier).update(&m.hash);
    for dep in deps {
        hasher.update(dep);
    }
    hasher.digest(len)
}

/// Hash of the chunk's own content
fn content_hash(
    chunk_graph: &ChunkGraph,
    modules: &ModuleGraph,
    chunk: ChunkKey,
    chunk_ids: &FxHashMap<ChunkKey, Id>,
    module_hashes: &FxHashMap<ModuleId, String>,
    len: usize,
) -> String {
    let c = chunk_graph.chunk(chunk);
    let mut members: Vec<(&str, &str)> = c
        .modules()
        .map(|m| {
            (
                modules.module(m).identifier.as_str(),
                module_hashes.get(&m).map(String::as_str).unwrap_or_default(),
            )
        })
        .collect();
    members.sort_unstable();

    let mut hasher = ContentHasher::new();
    hasher
        .update(chunk_ids.get(&chunk).map(Id::to_string).unwrap_or_default())
        .update(c.runtime().to_string());
    for (identifier, hash) in members {
        hasher.update(identifier).update(hash);
    }
    hasher.digest(len)
}

pub(crate) fn chunk_hashes(
    chunk_graph: &ChunkGraph,
    modules: &ModuleGraph,
    chunk_ids: &FxHashMap<ChunkKey, Id>,
    module_hashes: &FxHashMap<ModuleId, String>,
    len: usize,
) -> FxHashMap<ChunkKey, String> {
    let content: FxHashMap<ChunkKey, String> = chunk_graph
        .chunk_keys()
        .into_iter()
        .map(|c| (c, content_hash(chunk_graph, modules, c, chunk_ids, module_hashes, len)))
        .collect();

    // runtime chunks also depend on everything their entrypoints can load
    let mut served: FxHashMap<ChunkKey, BTreeSet<ChunkKey>> = FxHashMap::default();
    for group in chunk_graph.groups() {
        let Some(runtime) = group.runtime_chunk() else { continue };
        let reachable = served.entry(runtime).or_default();
        for key in chunk_graph.group_closure(group.key()) {
            reachable.extend(chunk_graph.group(key).chunks().iter().copied());
        }
        reachable.remove(&runtime);
    }

    content
        .iter()
        .map(|(&chunk, hash)| {
            let Some(reachable) = served.get(&chunk) else {
                return (chunk, hash.clone());
            };
            let mut others: Vec<(String, &str)> = reachable
                .iter()
                .filter_map(|c| {
                    let id = chunk_ids.get(c)?.to_string();
                    Some((id, content.get(c)?.as_str()))
                })
                .collect();
            others.sort_unstable();

            let mut hasher = ContentHasher::new();
            hasher.update(hash);
            for (id, other) in others {
                hasher.update(id).update(other);
            }
            (chunk, hasher.digest(len))
        })
        .collect()
}

pub(crate) fn full_hash(
    chunk_ids: &FxHashMap<ChunkKey, Id>,
    chunk_hashes: &FxHashMap<ChunkKey, String>,
    len: usize,
) -> String {
    let mut entries: Vec<(&Id, &str)> = chunk_hashes
        .iter()
        .filter_map(|(c, h)| Some((chunk_ids.get(c)?, h.as_str())))
        .collect();
    entries.sort_unstable();

    let mut hasher = ContentHasher::new();
    for (id, hash) in entries {
        hasher.update(id.to_string()).update(hash);
    }
    hasher.digest(len)
}
