//! Module graph data structures
//!
//! The module graph is the read-only input of the chunk graph core. It is
//! produced upstream (parsing, resolution, loaders) and handed over either
//! in memory or as JSON through [`ModuleGraph::from_json`].

mod input;
mod module;

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::GraphError;
use crate::utils::BitSet;

pub use input::{BlockInput, DependencyInput, EntryInput, GraphInput, ModuleInput, OneOrMany};
pub use module::{AsyncBlock, BlockId, Dependency, DependencyKind, Entry, Module, ModuleId, ModuleType};

/// The module dependency graph
#[derive(Debug, Default, Clone)]
pub struct ModuleGraph {
    /// All modules, indexed by [`ModuleId`]
    modules: Vec<Module>,

    /// Map from identifier to module ID
    identifier_to_id: FxHashMap<String, ModuleId>,

    /// Async blocks, indexed by [`BlockId`]
    blocks: Vec<AsyncBlock>,

    /// Entries in declaration order
    entries: Vec<Entry>,
}

impl ModuleGraph {
    /// Create a new empty module graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module to the graph
    ///
    /// Identifiers are unique; a second module with the same one is rejected.
    pub fn add_module(&mut self, module: Module) -> Result<ModuleId, GraphError> {
        if self.identifier_to_id.contains_key(&module.identifier) {
            return Err(GraphError::DuplicateModule(module.identifier));
        }

        let id = ModuleId::from_index(self.modules.len());
        self.identifier_to_id.insert(module.identifier.clone(), id);
        self.modules.push(module);
        Ok(id)
    }

    /// Add a dependency edge starting at `from`
    ///
    /// An async edge without a block gets a fresh anonymous block.
    pub fn add_dependency(&mut self, from: ModuleId, mut dependency: Dependency) -> Result<(), GraphError> {
        self.check_module(dependency.target)?;
        if dependency.kind == DependencyKind::Async && dependency.block.is_none() {
            dependency.block = Some(self.add_block(from, None)?);
        }
        if let Some(block) = dependency.block {
            let owner = self
                .blocks
                .get(block.index())
                .ok_or(GraphError::BlockOutOfBounds(block.index()))?
                .owner;
            if owner != from {
                return Err(GraphError::ForeignBlock {
                    block: block.index(),
                });
            }
        }
        self.module_mut(from)?.dependencies.push(dependency);
        Ok(())
    }

    /// Shorthand for a synchronous dependency
    pub fn add_sync_dependency(&mut self, from: ModuleId, to: ModuleId) -> Result<(), GraphError> {
        self.add_dependency(from, Dependency::sync(to))
    }

    /// Add an async block owned by `owner`
    pub fn add_block(&mut self, owner: ModuleId, chunk_name: Option<String>) -> Result<BlockId, GraphError> {
        self.check_module(owner)?;
        let id = BlockId::from_index(self.blocks.len());
        self.blocks.push(AsyncBlock { owner, chunk_name });
        self.modules[owner.index()].blocks.push(id);
        Ok(id)
    }

    /// Add a dependency to an async block
    pub fn add_block_dependency(&mut self, block: BlockId, target: ModuleId) -> Result<(), GraphError> {
        let owner = self
            .blocks
            .get(block.index())
            .ok_or(GraphError::BlockOutOfBounds(block.index()))?
            .owner;
        self.add_dependency(
            owner,
            Dependency {
                target,
                kind: DependencyKind::Async,
                block: Some(block),
                active: true,
            },
        )
    }

    /// Convenience for a one-target `import()`
    pub fn add_dynamic_import(
        &mut self,
        from: ModuleId,
        to: ModuleId,
        chunk_name: Option<&str>,
    ) -> Result<BlockId, GraphError> {
        let block = self.add_block(from, chunk_name.map(str::to_string))?;
        self.add_block_dependency(block, to)?;
        Ok(block)
    }

    /// Register an entry
    pub fn add_entry(&mut self, entry: Entry) -> Result<(), GraphError> {
        if entry.modules.is_empty() {
            return Err(GraphError::EmptyEntry(entry.name));
        }
        if self.entries.iter().any(|e| e.name == entry.name) {
            return Err(GraphError::DuplicateEntry(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Replace an entry with the same name, or add it
    pub fn upsert_entry(&mut self, entry: Entry) -> Result<(), GraphError> {
        if entry.modules.is_empty() {
            return Err(GraphError::EmptyEntry(entry.name));
        }
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    fn check_module(&self, id: ModuleId) -> Result<(), GraphError> {
        if id.index() < self.modules.len() {
            Ok(())
        } else {
            Err(GraphError::ModuleOutOfBounds(id.index()))
        }
    }

    fn module_mut(&mut self, id: ModuleId) -> Result<&mut Module, GraphError> {
        self.modules
            .get_mut(id.index())
            .ok_or(GraphError::ModuleOutOfBounds(id.index()))
    }

    /// Get module ID from identifier
    pub fn get_module_id(&self, identifier: &str) -> Option<ModuleId> {
        self.identifier_to_id.get(identifier).copied()
    }

    /// Get a module by ID
    pub fn get_module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    /// Get a module by an ID known to come from this graph
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    /// All modules in insertion order
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> + '_ {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId::from_index(i), m))
    }

    /// Outgoing edges of a module, including the ones owned by its blocks
    pub fn dependencies_of(&self, id: ModuleId) -> &[Dependency] {
        &self.modules[id.index()].dependencies
    }

    /// Async blocks owned by a module, in source order
    pub fn blocks_of(&self, id: ModuleId) -> &[BlockId] {
        &self.modules[id.index()].blocks
    }

    pub fn block(&self, id: BlockId) -> &AsyncBlock {
        &self.blocks[id.index()]
    }

    /// Dependencies grouped by a block
    pub fn block_dependencies(&self, id: BlockId) -> impl Iterator<Item = &Dependency> + '_ {
        let owner = self.blocks[id.index()].owner;
        self.dependencies_of(owner)
            .iter()
            .filter(move |dep| dep.block == Some(id))
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Get all modules reachable from a given module over followed edges (BFS)
    ///
    /// With `include_async` the traversal also crosses async blocks.
    pub fn get_reachable_modules(&self, start: ModuleId, include_async: bool) -> Vec<ModuleId> {
        let mut visited = BitSet::with_capacity(self.modules.len());
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        queue.push_back(start);
        visited.insert(start.index());

        while let Some(id) = queue.pop_front() {
            result.push(id);

            for dep in self.dependencies_of(id) {
                if !dep.is_followed() || (dep.block.is_some() && !include_async) {
                    continue;
                }
                if visited.insert(dep.target.index()) {
                    queue.push_back(dep.target);
                }
            }
        }

        result
    }

    /// Number of active, non-weak edges pointing at each module
    pub fn incoming_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.modules.len()];
        for module in &self.modules {
            for dep in &module.dependencies {
                if dep.is_followed() {
                    counts[dep.target.index()] += 1;
                }
            }
        }
        counts
    }

    /// Total number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_module_graph_basic() {
        let mut graph = ModuleGraph::new();

        let id = graph.add_module(Module::new("./src/main.js").with_size(10)).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get_module(id).is_some());
        assert_eq!(graph.get_module_id("./src/main.js"), Some(id));
        assert_eq!(graph.module(id).module_type, ModuleType::JavaScript);

        assert!(matches!(
            graph.add_module(Module::new("./src/main.js")),
            Err(GraphError::DuplicateModule(ref identifier)) if identifier == "./src/main.js"
        ));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.module(id).size, 10);
    }

    #[test]
    fn test_blocks_and_dependencies() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module(Module::new("./main.js")).unwrap();
        let a = graph.add_module(Module::new("./a.js")).unwrap();
        let lazy = graph.add_module(Module::new("./lazy.js")).unwrap();

        graph.add_sync_dependency(main, a).unwrap();
        let block = graph.add_dynamic_import(a, lazy, Some("lazy")).unwrap();

        assert_eq!(graph.blocks_of(a), &[block]);
        assert_eq!(graph.block(block).chunk_name.as_deref(), Some("lazy"));
        let targets: Vec<_> = graph.block_dependencies(block).map(|d| d.target).collect();
        assert_eq!(targets, vec![lazy]);
        assert_eq!(graph.dependencies_of(a)[0].kind, DependencyKind::Async);

        assert_eq!(graph.get_reachable_modules(main, false), vec![main, a]);
        assert_eq!(graph.get_reachable_modules(main, true), vec![main, a, lazy]);
    }

    #[test]
    fn test_rejects_foreign_block() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(Module::new("./a.js")).unwrap();
        let b = graph.add_module(Module::new("./b.js")).unwrap();
        let block = graph.add_block(a, None).unwrap();

        let err = graph
            .add_dependency(
                b,
                Dependency {
                    target: a,
                    kind: DependencyKind::Async,
                    block: Some(block),
                    active: true,
                },
            )
            .unwrap_err();
        assert!(matches!(err, GraphError::ForeignBlock { .. }));
    }

    #[test]
    fn test_entries_are_unique_and_non_empty() {
        let mut graph = ModuleGraph::new();
        let main = graph.add_module(Module::new("./main.js")).unwrap();

        graph.add_entry(Entry::new("main", main)).unwrap();
        assert!(matches!(
            graph.add_entry(Entry::new("main", main)),
            Err(GraphError::DuplicateEntry(_))
        ));

        let empty = Entry {
            name: "empty".into(),
            modules: vec![],
            runtime: None,
            depend_on: vec![],
        };
        assert!(matches!(graph.add_entry(empty), Err(GraphError::EmptyEntry(_))));
    }

    #[test]
    fn test_incoming_counts_skip_weak_edges() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(Module::new("./a.js")).unwrap();
        let b = graph.add_module(Module::new("./b.js")).unwrap();
        let c = graph.add_module(Module::new("./c.js")).unwrap();
        graph.add_sync_dependency(a, c).unwrap();
        graph.add_sync_dependency(b, c).unwrap();
        graph.add_dependency(a, Dependency::weak(b)).unwrap();

        assert_eq!(graph.incoming_counts(), vec![0, 0, 2]);
    }
}
