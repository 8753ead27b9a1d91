//! Chunk graph builder
//!
//! Walks the module graph breadth-first from every entry and assigns modules
//! to chunk groups. Each `(module, group)` pair is visited at most once: the
//! per-module membership mask (a bitset keyed by group index) is checked on
//! every edge, which is also what makes circular and self imports terminate.
//!
//! Async blocks are deferred until the sync closure that reached them has
//! been processed, then each block is mapped to a child group:
//!
//! 1. the group already created for that block, or
//! 2. the group already created for the same chunk name hint, or
//! 3. a fresh async group owning one fresh chunk.

mod available;
mod entries;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::chunk_graph::{ChunkGraph, ChunkGroupKey, ChunkGroupKind, ChunkKey, GroupOrigin, RuntimeSpec};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{BuildError, BuildResult};
use crate::graph::{BlockId, DependencyKind, ModuleGraph, ModuleId};
use crate::utils::{format_duration, BitSet};

/// Where the runtime of an entrypoint lives
#[derive(Clone, Default)]
pub enum RuntimeChunk {
    /// The entry chunk hosts its own runtime
    #[default]
    None,
    /// One `runtime` chunk shared by all entrypoints
    Single,
    /// One `runtime~<entry>` chunk per entrypoint
    Multiple,
    /// Name template, `[name]` is replaced with the entry name
    Named(String),
    /// Runtime name computed per entry
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl RuntimeChunk {
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Runtime name for an entry, `None` when the entry chunk hosts it
    pub fn runtime_name(&self, entry: &str) -> Option<String> {
        match self {
            RuntimeChunk::None => None,
            RuntimeChunk::Single => Some("runtime".to_string()),
            RuntimeChunk::Multiple => Some(format!("runtime~{}", entry)),
            RuntimeChunk::Named(template) => Some(template.replace("[name]", entry)),
            RuntimeChunk::Custom(f) => Some(f(entry)),
        }
    }
}

impl fmt::Debug for RuntimeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeChunk::None => write!(f, "None"),
            RuntimeChunk::Single => write!(f, "Single"),
            RuntimeChunk::Multiple => write!(f, "Multiple"),
            RuntimeChunk::Named(template) => f.debug_tuple("Named").field(template).finish(),
            RuntimeChunk::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Builder options
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Skip modules in child groups that every parent path already loaded
    pub remove_available_modules: bool,

    /// Runtime chunk placement
    pub runtime_chunk: RuntimeChunk,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            remove_available_modules: true,
            runtime_chunk: RuntimeChunk::None,
        }
    }
}

/// Build a chunk graph with the given options
pub fn build_chunk_graph(modules: &ModuleGraph, options: BuildOptions) -> BuildResult<ChunkGraph> {
    ChunkGraphBuilder::new(modules, options).build()
}

pub struct ChunkGraphBuilder<'a> {
    modules: &'a ModuleGraph,
    options: BuildOptions,
    chunk_graph: ChunkGraph,

    /// Per module: groups that already contain it
    masks: Vec<BitSet>,

    /// Per group: modules in traversal order
    group_modules: Vec<Vec<ModuleId>>,

    /// Per group: entry modules or block targets
    group_roots: Vec<BitSet>,

    named_groups: FxHashMap<String, ChunkGroupKey>,
    queue: VecDeque<(ModuleId, ChunkGroupKey)>,
    delayed: Vec<(BlockId, ChunkGroupKey)>,
    inserted: usize,
}

impl<'a> ChunkGraphBuilder<'a> {
    pub fn new(modules: &'a ModuleGraph, options: BuildOptions) -> Self {
        Self {
            modules,
            options,
            chunk_graph: ChunkGraph::new(),
            masks: vec![BitSet::new(); modules.len()],
            group_modules: Vec::new(),
            group_roots: Vec::new(),
            named_groups: FxHashMap::default(),
            queue: VecDeque::new(),
            delayed: Vec::new(),
            inserted: 0,
        }
    }

    pub fn build(mut self) -> BuildResult<ChunkGraph> {
        let start = Instant::now();
        let order = entries::validate_entries(self.modules)?;

        self.create_entrypoints();
        self.traverse()?;

        if self.options.remove_available_modules {
            available::remove_available_modules(&self.chunk_graph, &mut self.group_modules, &self.group_roots);
        }

        self.materialize();
        self.assign_runtimes(&order);
        self.chunk_graph.refresh_chunk_runtimes();

        debug!(
            "Chunk graph built: {} groups, {} chunks, {} placements in {}",
            self.chunk_graph.group_count(),
            self.chunk_graph.chunk_count(),
            self.inserted,
            format_duration(start.elapsed())
        );

        Ok(self.chunk_graph)
    }

    fn create_entrypoints(&mut self) {
        let modules = self.modules;
        for entry in modules.entries() {
            let chunk = self.chunk_graph.add_chunk(Some(entry.name.clone()));
            let group = self.chunk_graph.add_group(ChunkGroupKind::Entrypoint {
                name: entry.name.clone(),
                entrypoint_chunk: chunk,
                runtime_chunk: chunk,
            });
            self.chunk_graph.connect_chunk_and_group(chunk, group);
            self.push_group_state();

            for &module in &entry.modules {
                self.group_roots[group.index()].insert(module.index());
                self.chunk_graph.group_mut(group).origins.push(GroupOrigin { module, block: None });
                self.queue.push_back((module, group));
            }
            trace!("Entrypoint {} -> {}", entry.name, group);
        }

        // Dependent entrypoints see their bases as parents
        for entry in modules.entries() {
            for base in &entry.depend_on {
                if let (Some(parent), Some(child)) =
                    (self.chunk_graph.entrypoint(base), self.chunk_graph.entrypoint(&entry.name))
                {
                    self.chunk_graph.connect_groups(parent, child);
                }
            }
        }
    }

    fn push_group_state(&mut self) {
        self.group_modules.push(Vec::new());
        self.group_roots.push(BitSet::new());
    }

    fn traverse(&mut self) -> BuildResult<()> {
        loop {
            while let Some((module, group)) = self.queue.pop_front() {
                self.visit(module, group)?;
            }
            if self.delayed.is_empty() {
                return Ok(());
            }
            for (block, parent) in std::mem::take(&mut self.delayed) {
                self.process_block(block, parent);
            }
        }
    }

    fn visit(&mut self, module: ModuleId, group: ChunkGroupKey) -> BuildResult<()> {
        if !self.masks[module.index()].insert(group.index()) {
            return Ok(());
        }

        self.inserted += 1;
        let limit = self.modules.len() * self.chunk_graph.group_count();
        if self.inserted > limit {
            return Err(BuildError::TraversalLimitExceeded {
                processed: self.inserted,
                limit,
            });
        }

        self.group_modules[group.index()].push(module);

        let modules = self.modules;
        for dep in modules.dependencies_of(module) {
            if dep.block.is_none() && dep.kind == DependencyKind::Sync && dep.active {
                self.queue.push_back((dep.target, group));
            }
        }
        for &block in modules.blocks_of(module) {
            self.delayed.push((block, group));
        }
        Ok(())
    }

    fn process_block(&mut self, block: BlockId, parent: ChunkGroupKey) {
        let child = match self.chunk_graph.block_group(block) {
            Some(child) => child,
            None => {
                let child = self.group_for_block(block);
                self.chunk_graph.block_groups.insert(block, child);
                let owner = self.modules.block(block).owner;
                self.chunk_graph.group_mut(child).origins.push(GroupOrigin {
                    module: owner,
                    block: Some(block),
                });
                child
            }
        };

        if self.chunk_graph.is_ancestor_or_self(child, parent) {
            trace!("Edge {} -> {} would close a cycle, keeping it as a back edge", parent, child);
            self.chunk_graph.connect_back_edge(parent, child);
        } else {
            self.chunk_graph.connect_groups(parent, child);
        }

        let modules = self.modules;
        for dep in modules.block_dependencies(block) {
            if dep.is_followed() {
                self.group_roots[child.index()].insert(dep.target.index());
                self.queue.push_back((dep.target, child));
            }
        }
    }

    fn group_for_block(&mut self, block: BlockId) -> ChunkGroupKey {
        let modules = self.modules;
        let async_block = modules.block(block);
        match &async_block.chunk_name {
            Some(name) if self.chunk_graph.entrypoint(name).is_some() => {
                let module = modules.module(async_block.owner).identifier.clone();
                self.chunk_graph
                    .push_diagnostic(Diagnostic::warning(DiagnosticKind::AsyncChunkNamedLikeEntrypoint {
                        name: name.clone(),
                        module,
                    }));
                self.create_async_group(None)
            }
            Some(name) => match self.named_groups.get(name) {
                Some(&group) => group,
                None => {
                    let group = self.create_async_group(Some(name.clone()));
                    self.named_groups.insert(name.clone(), group);
                    group
                }
            },
            None => self.create_async_group(None),
        }
    }

    fn create_async_group(&mut self, name: Option<String>) -> ChunkGroupKey {
        let chunk = self.chunk_graph.add_chunk(name.clone());
        let group = self.chunk_graph.add_group(ChunkGroupKind::Async { name });
        self.chunk_graph.connect_chunk_and_group(chunk, group);
        self.push_group_state();
        group
    }

    /// Write the traversal result into the chunks
    fn materialize(&mut self) {
        for (index, modules) in self.group_modules.iter().enumerate() {
            let key = ChunkGroupKey::from_index(index);
            let Some(&chunk) = self.chunk_graph.group(key).chunks().first() else {
                continue;
            };
            for &module in modules {
                self.chunk_graph.connect_chunk_and_module(chunk, module);
            }
        }

        for entry in self.modules.entries() {
            let Some(group) = self.chunk_graph.entrypoint(&entry.name) else {
                continue;
            };
            let Some(chunk) = self.chunk_graph.group(group).entrypoint_chunk() else {
                continue;
            };
            for &module in &entry.modules {
                self.chunk_graph.connect_chunk_and_entry_module(chunk, module, group);
            }
        }
    }

    /// Assign runtimes to groups and create runtime chunks
    ///
    /// `order` lists entries with their `depend_on` bases first.
    fn assign_runtimes(&mut self, order: &[usize]) {
        let modules = self.modules;
        let entries = modules.entries();
        let mut runtime_chunks: FxHashMap<String, ChunkKey> = FxHashMap::default();

        for &index in order {
            let entry = &entries[index];
            let Some(group) = self.chunk_graph.entrypoint(&entry.name) else {
                continue;
            };

            if !entry.depend_on.is_empty() {
                self.inherit_runtime(group, &entry.name, &entry.depend_on);
                continue;
            }

            let runtime_name = entry
                .runtime
                .clone()
                .or_else(|| self.options.runtime_chunk.runtime_name(&entry.name));

            match runtime_name {
                Some(name) if name != entry.name => {
                    let chunk = match runtime_chunks.get(&name) {
                        Some(&chunk) => chunk,
                        None => {
                            let chunk = self.chunk_graph.add_chunk(Some(name.clone()));
                            self.chunk_graph.chunk_mut(chunk).prevent_integration = true;
                            runtime_chunks.insert(name.clone(), chunk);
                            chunk
                        }
                    };
                    self.chunk_graph.unshift_chunk_into_group(chunk, group);
                    let group = self.chunk_graph.group_mut(group);
                    group.set_runtime_chunk(chunk);
                    group.runtime = RuntimeSpec::single(name);
                }
                _ => {
                    self.chunk_graph.group_mut(group).runtime = RuntimeSpec::single(entry.name.clone());
                }
            }
        }

        // Runtimes only grow, so back edges settle after a few rounds
        let order = self.chunk_graph.topological_groups();
        let mut changed = true;
        while changed {
            changed = false;
            for &key in &order {
                if self.chunk_graph.group(key).is_initial() {
                    continue;
                }
                let mut runtime = self.chunk_graph.group(key).runtime().clone();
                for loader in self.chunk_graph.group(key).loaders() {
                    changed |= runtime.extend(self.chunk_graph.group(loader).runtime());
                }
                self.chunk_graph.group_mut(key).runtime = runtime;
            }
        }
    }

    fn inherit_runtime(&mut self, group: ChunkGroupKey, name: &str, depend_on: &[String]) {
        let bases: Vec<ChunkGroupKey> = depend_on
            .iter()
            .filter_map(|base| self.chunk_graph.entrypoint(base))
            .collect();

        let mixed = bases
            .windows(2)
            .any(|w| self.chunk_graph.group(w[0]).runtime() != self.chunk_graph.group(w[1]).runtime());
        if mixed {
            self.chunk_graph
                .push_diagnostic(Diagnostic::warning(DiagnosticKind::MixedDependOnRuntimes {
                    entry: name.to_string(),
                }));
        }

        let mut runtime = RuntimeSpec::new();
        for base in &bases {
            runtime.extend(self.chunk_graph.group(*base).runtime());
        }
        let runtime_chunk = bases
            .first()
            .and_then(|base| self.chunk_graph.group(*base).runtime_chunk());

        let group = self.chunk_graph.group_mut(group);
        group.runtime = runtime;
        if let Some(chunk) = runtime_chunk {
            group.set_runtime_chunk(chunk);
        }
    }
}
