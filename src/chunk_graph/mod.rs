//! Chunk graph: chunks, chunk groups and the module↔chunk relation
//!
//! The chunk graph is an owned value. The builder creates it, the optimizer
//! mutates it, and id assignment consumes it into a
//! [`SealedChunkGraph`](crate::ids::SealedChunkGraph). All relations are kept
//! consistent by going through the `connect_*`/`disconnect_*` methods.

mod chunk;
mod chunk_group;
mod runtime;

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::graph::{BlockId, ModuleGraph, ModuleId};
use crate::utils::BitSet;

pub use chunk::{Chunk, ChunkKey};
pub use chunk_group::{ChunkGroup, ChunkGroupKey, ChunkGroupKind, GroupOrigin};
pub use runtime::RuntimeSpec;

#[derive(Debug, Clone)]
pub struct ChunkGraph {
    chunks: IndexMap<ChunkKey, Chunk>,
    next_chunk: usize,
    groups: Vec<ChunkGroup>,
    module_chunks: FxHashMap<ModuleId, BTreeSet<ChunkKey>>,
    named_chunks: FxHashMap<String, ChunkKey>,
    entrypoints: IndexMap<String, ChunkGroupKey>,
    pub(crate) block_groups: FxHashMap<BlockId, ChunkGroupKey>,
    pub(crate) diagnostics: Diagnostics,
}

impl Default for ChunkGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkGraph {
    pub fn new() -> Self {
        Self {
            chunks: IndexMap::new(),
            next_chunk: 0,
            groups: Vec::new(),
            module_chunks: FxHashMap::default(),
            named_chunks: FxHashMap::default(),
            entrypoints: IndexMap::new(),
            block_groups: FxHashMap::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    // ---- chunks -------------------------------------------------------

    /// Create a chunk, registering its name
    pub fn add_chunk(&mut self, name: Option<String>) -> ChunkKey {
        let key = ChunkKey::from_index(self.next_chunk);
        self.next_chunk += 1;
        self.chunks.insert(key, Chunk::new(key, None));
        if let Some(name) = name {
            self.set_chunk_name(key, name);
        }
        key
    }

    /// Name a chunk; on collision the last writer wins and a warning is recorded
    pub fn set_chunk_name(&mut self, key: ChunkKey, name: String) {
        if let Some(previous) = self.named_chunks.insert(name.clone(), key) {
            if previous != key {
                self.push_diagnostic(Diagnostic::warning(DiagnosticKind::ChunkNameConflict {
                    name: name.clone(),
                }));
                if let Some(chunk) = self.chunks.get_mut(&previous) {
                    chunk.name = None;
                }
            }
        }
        if let Some(chunk) = self.chunks.get_mut(&key) {
            if let Some(old) = chunk.name.replace(name) {
                if self.named_chunks.get(&old) == Some(&key) {
                    self.named_chunks.remove(&old);
                }
            }
        }
    }

    pub fn get_chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Get a chunk known to be alive; panics on a removed key
    pub fn chunk(&self, key: ChunkKey) -> &Chunk {
        &self.chunks[&key]
    }

    pub(crate) fn chunk_mut(&mut self, key: ChunkKey) -> &mut Chunk {
        self.chunks
            .get_mut(&key)
            .unwrap_or_else(|| panic!("chunk {} was removed", key))
    }

    /// Live chunks in creation order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_keys(&self) -> Vec<ChunkKey> {
        self.chunks.keys().copied().collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn named_chunk(&self, name: &str) -> Option<ChunkKey> {
        self.named_chunks.get(name).copied()
    }

    /// Remove a chunk from all groups and relations
    pub fn remove_chunk(&mut self, key: ChunkKey) -> Option<Chunk> {
        let chunk = self.chunks.shift_remove(&key)?;
        for group in &chunk.groups {
            self.groups[group.index()].remove_chunk(key);
        }
        for module in &chunk.modules {
            if let Some(set) = self.module_chunks.get_mut(module) {
                set.remove(&key);
            }
        }
        if let Some(name) = &chunk.name {
            if self.named_chunks.get(name) == Some(&key) {
                self.named_chunks.remove(name);
            }
        }
        Some(chunk)
    }

    // ---- groups -------------------------------------------------------

    pub fn add_group(&mut self, kind: ChunkGroupKind) -> ChunkGroupKey {
        let key = ChunkGroupKey::from_index(self.groups.len());
        if let ChunkGroupKind::Entrypoint { name, .. } = &kind {
            self.entrypoints.insert(name.clone(), key);
        }
        self.groups.push(ChunkGroup::new(key, kind));
        key
    }

    pub fn group(&self, key: ChunkGroupKey) -> &ChunkGroup {
        &self.groups[key.index()]
    }

    pub(crate) fn group_mut(&mut self, key: ChunkGroupKey) -> &mut ChunkGroup {
        &mut self.groups[key.index()]
    }

    /// Groups in creation order
    pub fn groups(&self) -> impl Iterator<Item = &ChunkGroup> {
        self.groups.iter()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Entrypoints in declaration order
    pub fn entrypoints(&self) -> impl Iterator<Item = (&str, ChunkGroupKey)> {
        self.entrypoints.iter().map(|(name, key)| (name.as_str(), *key))
    }

    pub fn entrypoint(&self, name: &str) -> Option<ChunkGroupKey> {
        self.entrypoints.get(name).copied()
    }

    /// Group created for an async block, if the block was reached
    pub fn block_group(&self, block: BlockId) -> Option<ChunkGroupKey> {
        self.block_groups.get(&block).copied()
    }

    /// Add a parent → child edge
    pub fn connect_groups(&mut self, parent: ChunkGroupKey, child: ChunkGroupKey) -> bool {
        let added = self.groups[parent.index()].children.insert(child);
        self.groups[child.index()].parents.insert(parent);
        added
    }

    /// Record that `parent` loads `child` without adding a DAG edge
    ///
    /// Used when `child` is already an ancestor of `parent`.
    pub fn connect_back_edge(&mut self, parent: ChunkGroupKey, child: ChunkGroupKey) -> bool {
        if parent == child {
            return false;
        }
        let added = self.groups[parent.index()].back_children.insert(child);
        self.groups[child.index()].back_parents.insert(parent);
        added
    }

    /// Whether `ancestor` is `group` or reachable through its parents
    pub fn is_ancestor_or_self(&self, ancestor: ChunkGroupKey, group: ChunkGroupKey) -> bool {
        let mut visited = BitSet::with_capacity(self.groups.len());
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if visited.insert(current.index()) {
                stack.extend(self.groups[current.index()].parents());
            }
        }
        false
    }

    /// `root` plus every group it can load, through child and back edges
    pub fn group_closure(&self, root: ChunkGroupKey) -> Vec<ChunkGroupKey> {
        let mut visited = BitSet::with_capacity(self.groups.len());
        let mut queue = VecDeque::from([root]);
        let mut result = Vec::new();
        visited.insert(root.index());
        while let Some(current) = queue.pop_front() {
            result.push(current);
            let group = &self.groups[current.index()];
            for child in group.children().chain(group.back_children()) {
                if visited.insert(child.index()) {
                    queue.push_back(child);
                }
            }
        }
        result
    }

    /// Groups ordered so that every parent precedes its children
    ///
    /// Ties are broken by group key, so the order is deterministic.
    pub fn topological_groups(&self) -> Vec<ChunkGroupKey> {
        let mut in_degree: Vec<usize> = self.groups.iter().map(|g| g.parents.len()).collect();
        let mut ready: BTreeSet<ChunkGroupKey> = self
            .groups
            .iter()
            .filter(|g| g.parents.is_empty())
            .map(|g| g.key)
            .collect();
        let mut order = Vec::with_capacity(self.groups.len());

        while let Some(key) = ready.pop_first() {
            order.push(key);
            for child in self.groups[key.index()].children() {
                in_degree[child.index()] -= 1;
                if in_degree[child.index()] == 0 {
                    ready.insert(child);
                }
            }
        }
        order
    }

    // ---- chunk ↔ group ------------------------------------------------

    pub fn connect_chunk_and_group(&mut self, chunk: ChunkKey, group: ChunkGroupKey) {
        if self.groups[group.index()].push_chunk(chunk) {
            self.chunk_mut(chunk).groups.insert(group);
        }
    }

    pub(crate) fn unshift_chunk_into_group(&mut self, chunk: ChunkKey, group: ChunkGroupKey) {
        if self.groups[group.index()].unshift_chunk(chunk) {
            self.chunk_mut(chunk).groups.insert(group);
        }
    }

    /// Add `new` to every group of `from`, right before `from`
    ///
    /// The new chunk inherits the runtime of `from`.
    pub fn split_chunk(&mut self, from: ChunkKey, new: ChunkKey) {
        let groups: Vec<ChunkGroupKey> = self.chunk(from).groups().collect();
        let runtime = self.chunk(from).runtime.clone();
        for group in groups {
            if self.groups[group.index()].insert_chunk_before(new, from) {
                self.chunk_mut(new).groups.insert(group);
            }
        }
        self.chunk_mut(new).runtime.extend(&runtime);
    }

    /// Move everything from `source` into `target` and remove `source`
    pub fn integrate_chunks(&mut self, target: ChunkKey, source: ChunkKey) {
        let Some(source_chunk) = self.remove_chunk(source) else {
            return;
        };
        for module in source_chunk.modules {
            self.connect_chunk_and_module(target, module);
        }
        for (module, group) in source_chunk.entry_modules {
            self.connect_chunk_and_entry_module(target, module, group);
        }
        for group in source_chunk.groups {
            if self.groups[group.index()].push_chunk(target) {
                self.chunk_mut(target).groups.insert(group);
            }
            if let ChunkGroupKind::Entrypoint { runtime_chunk, .. } = self.groups[group.index()].kind {
                if runtime_chunk == source {
                    self.groups[group.index()].set_runtime_chunk(target);
                }
            }
        }
        let target_chunk = self.chunk_mut(target);
        target_chunk.runtime.extend(&source_chunk.runtime);
        target_chunk.id_name_hints.extend(source_chunk.id_name_hints);
    }

    // ---- chunk ↔ module -----------------------------------------------

    pub fn connect_chunk_and_module(&mut self, chunk: ChunkKey, module: ModuleId) -> bool {
        let added = self.chunk_mut(chunk).modules.insert(module);
        if added {
            self.module_chunks.entry(module).or_default().insert(chunk);
        }
        added
    }

    pub fn disconnect_chunk_and_module(&mut self, chunk: ChunkKey, module: ModuleId) -> bool {
        let removed = self.chunk_mut(chunk).modules.remove(&module);
        if removed {
            if let Some(set) = self.module_chunks.get_mut(&module) {
                set.remove(&chunk);
            }
        }
        removed
    }

    pub fn connect_chunk_and_entry_module(&mut self, chunk: ChunkKey, module: ModuleId, group: ChunkGroupKey) {
        self.connect_chunk_and_module(chunk, module);
        self.chunk_mut(chunk).entry_modules.insert(module, group);
    }

    /// Chunks containing a module, in key order
    pub fn module_chunks(&self, module: ModuleId) -> impl Iterator<Item = ChunkKey> + '_ {
        self.module_chunks
            .get(&module)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    pub fn module_chunk_count(&self, module: ModuleId) -> usize {
        self.module_chunks.get(&module).map_or(0, BTreeSet::len)
    }

    pub fn is_module_in_chunk(&self, module: ModuleId, chunk: ChunkKey) -> bool {
        self.get_chunk(chunk).is_some_and(|c| c.contains_module(module))
    }

    /// Whether any chunk hosts `module` as an entry module
    pub fn is_entry_module(&self, module: ModuleId) -> bool {
        self.module_chunks(module)
            .any(|c| self.chunk(c).entry_modules.contains_key(&module))
    }

    /// Modules that ended up in at least one chunk, ascending
    pub fn chunked_modules(&self) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self
            .module_chunks
            .iter()
            .filter(|(_, chunks)| !chunks.is_empty())
            .map(|(module, _)| *module)
            .collect();
        modules.sort();
        modules
    }

    // ---- chunk queries -------------------------------------------------

    /// Total size of the modules in a chunk
    pub fn chunk_size(&self, chunk: ChunkKey, modules: &ModuleGraph) -> u64 {
        self.chunk(chunk)
            .modules()
            .map(|m| modules.module(m).size)
            .sum()
    }

    /// Part of at least one entrypoint
    pub fn can_be_initial(&self, chunk: ChunkKey) -> bool {
        self.chunk(chunk)
            .groups()
            .any(|g| self.groups[g.index()].is_initial())
    }

    /// Only part of entrypoints
    pub fn is_only_initial(&self, chunk: ChunkKey) -> bool {
        let c = self.chunk(chunk);
        !c.groups.is_empty() && c.groups().all(|g| self.groups[g.index()].is_initial())
    }

    /// Hosts the runtime of at least one entrypoint
    pub fn has_runtime(&self, chunk: ChunkKey) -> bool {
        self.chunk(chunk)
            .groups()
            .any(|g| self.groups[g.index()].runtime_chunk() == Some(chunk))
    }

    /// Number of parallel requests needed to load the chunk
    pub fn requests(&self, chunk: ChunkKey) -> usize {
        self.chunk(chunk)
            .groups()
            .map(|g| self.groups[g.index()].chunks.len())
            .max()
            .unwrap_or(0)
    }

    /// Recompute chunk runtimes from the groups they belong to
    pub(crate) fn refresh_chunk_runtimes(&mut self) {
        let keys = self.chunk_keys();
        for key in keys {
            let mut runtime = RuntimeSpec::new();
            for group in self.chunk(key).groups() {
                runtime.extend(&self.groups[group.index()].runtime);
            }
            self.chunk_mut(key).runtime = runtime;
        }
    }

    /// Structural invariant check: no module twice in one group, acyclic
    /// group edges, consistent relations. Returns human readable violations.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for group in &self.groups {
            let mut seen = BTreeSet::new();
            for chunk in group.chunks() {
                let Some(c) = self.get_chunk(*chunk) else {
                    violations.push(format!("group {} references removed chunk {}", group.key, chunk));
                    continue;
                };
                if !c.groups.contains(&group.key) {
                    violations.push(format!("chunk {} does not list group {}", chunk, group.key));
                }
                for module in c.modules() {
                    if !seen.insert(module) {
                        violations.push(format!("module {} appears twice in group {}", module, group.key));
                    }
                }
            }
        }

        if self.topological_groups().len() != self.groups.len() {
            violations.push("chunk group edges contain a cycle".to_string());
        }

        for chunk in self.chunks() {
            for module in chunk.modules() {
                let listed = self
                    .module_chunks
                    .get(&module)
                    .is_some_and(|set| set.contains(&chunk.key));
                if !listed {
                    violations.push(format!("module {} in chunk {} is not indexed", module, chunk.key));
                }
            }
        }

        violations
    }
}
