//! Max size subdivision
//!
//! Oversized chunks are cut into parts by deterministic grouping: modules
//! are sorted by identifier and a range is split where neighbouring
//! identifiers have the least in common, keeping both halves at or above the
//! min size when possible. The same input always yields the same parts.

use std::ops::Range;

use tracing::debug;

use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::graph::{ModuleGraph, ModuleId};
use crate::utils::ContentHasher;

#[derive(Debug, Clone)]
pub(super) struct Node {
    pub module: ModuleId,
    pub key: String,
    pub size: u64,
}

/// Limits applied to one chunk
#[derive(Debug, Clone, Copy)]
pub(super) struct SizeLimits {
    pub min_size: u64,
    pub max_size: u64,
}

/// Split `nodes` (sorted by key) into contiguous ranges
pub(super) fn deterministic_grouping(nodes: &[Node], limits: SizeLimits) -> Vec<Range<usize>> {
    let total = |range: &Range<usize>| nodes[range.clone()].iter().map(|n| n.size).sum::<u64>();

    let mut result = Vec::new();
    let mut stack = vec![0..nodes.len()];

    while let Some(range) = stack.pop() {
        if range.len() <= 1 || total(&range) <= limits.max_size {
            result.push(range);
            continue;
        }

        let (start, end) = (range.start, range.end);

        // smallest left part reaching min size
        let mut left = start + 1;
        let mut acc = nodes[start].size;
        while left < end - 1 && acc < limits.min_size {
            acc += nodes[left].size;
            left += 1;
        }

        // smallest right part reaching min size
        let mut right = end - 1;
        let mut acc = nodes[end - 1].size;
        while right > start + 1 && acc < limits.min_size {
            right -= 1;
            acc += nodes[right].size;
        }

        let (lo, hi) = if left <= right {
            (left, right)
        } else {
            let middle = size_midpoint(nodes, &range);
            (middle, middle)
        };

        let half = total(&range) / 2;
        let split = (lo..=hi)
            .min_by_key(|&p| {
                let left_size: u64 = nodes[start..p].iter().map(|n| n.size).sum();
                (
                    common_prefix(&nodes[p - 1].key, &nodes[p].key),
                    left_size.abs_diff(half),
                )
            })
            .unwrap_or(lo);

        stack.push(split..end);
        stack.push(start..split);
    }

    result.sort_by_key(|r| r.start);
    result
}

fn size_midpoint(nodes: &[Node], range: &Range<usize>) -> usize {
    let half: u64 = nodes[range.clone()].iter().map(|n| n.size).sum::<u64>() / 2;
    let mut acc = 0;
    for i in range.clone() {
        acc += nodes[i].size;
        if acc >= half {
            return (i + 1).clamp(range.start + 1, range.end - 1);
        }
    }
    range.end - 1
}

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Subdivide one chunk; returns the chunks created
pub(super) fn split_oversized_chunk(
    chunk_graph: &mut ChunkGraph,
    modules: &ModuleGraph,
    chunk: ChunkKey,
    limits: SizeLimits,
    delimiter: &str,
) -> Vec<ChunkKey> {
    let mut nodes: Vec<Node> = chunk_graph
        .chunk(chunk)
        .modules()
        .filter(|m| !chunk_graph.chunk(chunk).entry_modules.contains_key(m))
        .map(|m| {
            let module = modules.module(m);
            Node {
                module: m,
                key: module.identifier.clone(),
                size: module.size,
            }
        })
        .collect();
    if nodes.len() < 2 {
        return Vec::new();
    }
    nodes.sort_by(|a, b| a.key.cmp(&b.key));

    for node in &nodes {
        if node.size > limits.max_size {
            chunk_graph.push_diagnostic(Diagnostic::warning(DiagnosticKind::ModuleExceedsMaxSize {
                module: node.key.clone(),
                size: node.size,
                max_size: limits.max_size,
            }));
        }
    }

    let parts = deterministic_grouping(&nodes, limits);
    if parts.len() < 2 {
        return Vec::new();
    }

    let source = chunk_graph.chunk(chunk).clone();
    let mut created = Vec::new();

    // the last part stays in the original chunk
    for part in &parts[..parts.len() - 1] {
        let name = source.name().map(|name| {
            let mut hasher = ContentHasher::new();
            for node in &nodes[part.clone()] {
                hasher.update(&node.key);
            }
            format!("{}{}{}", name, delimiter, hasher.digest(8))
        });

        let new_chunk = chunk_graph.add_chunk(name);
        chunk_graph.split_chunk(chunk, new_chunk);
        {
            let target = chunk_graph.chunk_mut(new_chunk);
            target.id_name_hints = source.id_name_hints.clone();
            target.cache_group = source.cache_group.clone();
            target.filename_template = source.filename_template.clone();
        }
        for node in &nodes[part.clone()] {
            chunk_graph.disconnect_chunk_and_module(chunk, node.module);
            chunk_graph.connect_chunk_and_module(new_chunk, node.module);
        }
        created.push(new_chunk);
    }

    debug!(
        "Split oversized chunk {} into {} parts",
        chunk,
        created.len() + 1
    );
    created
}
