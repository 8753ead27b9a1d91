//! Chunks: output units owning a set of modules

use std::collections::BTreeSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};

use super::{ChunkGroupKey, RuntimeSpec};
use crate::graph::ModuleId;

/// Arena key of a chunk, allocated in creation order and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey(u32);

impl ChunkKey {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A chunk is a group of modules that will be emitted together
#[derive(Debug, Clone)]
pub struct Chunk {
    pub(crate) key: ChunkKey,

    /// Chunk name (used for output filename and named ids)
    pub(crate) name: Option<String>,

    /// Modules owned by this chunk
    pub(crate) modules: BTreeSet<ModuleId>,

    /// Entry modules and the entrypoint they start
    pub(crate) entry_modules: IndexMap<ModuleId, ChunkGroupKey>,

    /// Chunk groups this chunk is part of, in insertion order
    pub(crate) groups: IndexSet<ChunkGroupKey>,

    /// Runtimes this chunk is loaded in
    pub(crate) runtime: RuntimeSpec,

    /// Hints used when deriving readable ids (e.g. `vendors`)
    pub(crate) id_name_hints: BTreeSet<String>,

    /// Filename template requested by a cache group
    pub(crate) filename_template: Option<String>,

    /// Cache group that created this chunk
    pub(crate) cache_group: Option<String>,

    /// Runtime chunks are never merged into other chunks
    pub(crate) prevent_integration: bool,
}

impl Chunk {
    pub(crate) fn new(key: ChunkKey, name: Option<String>) -> Self {
        Self {
            key,
            name,
            modules: BTreeSet::new(),
            entry_modules: IndexMap::new(),
            groups: IndexSet::new(),
            runtime: RuntimeSpec::new(),
            id_name_hints: BTreeSet::new(),
            filename_template: None,
            cache_group: None,
            prevent_integration: false,
        }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.iter().copied()
    }

    pub fn contains_module(&self, module: ModuleId) -> bool {
        self.modules.contains(&module)
    }

    pub fn entry_modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.entry_modules.keys().copied()
    }

    pub fn has_entry_module(&self) -> bool {
        !self.entry_modules.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.groups.iter().copied()
    }

    pub fn runtime(&self) -> &RuntimeSpec {
        &self.runtime
    }

    pub fn id_name_hints(&self) -> impl Iterator<Item = &str> {
        self.id_name_hints.iter().map(String::as_str)
    }

    pub fn filename_template(&self) -> Option<&str> {
        self.filename_template.as_deref()
    }

    pub fn cache_group(&self) -> Option<&str> {
        self.cache_group.as_deref()
    }

    /// Check if chunk is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of modules in chunk
    pub fn len(&self) -> usize {
        self.modules.len()
    }
}
