//! Chunk groups: chunks that load together for one entry or one async import

use std::fmt;

use indexmap::IndexSet;

use super::{ChunkKey, RuntimeSpec};
use crate::graph::{BlockId, ModuleId};

/// Arena key of a chunk group; doubles as the bit index in membership masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkGroupKey(u32);

impl ChunkGroupKey {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChunkGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkGroupKind {
    /// Rooted at a user-declared entry
    Entrypoint {
        name: String,
        entrypoint_chunk: ChunkKey,
        runtime_chunk: ChunkKey,
    },
    /// Created at an async boundary
    Async { name: Option<String> },
}

/// Where a chunk group was requested from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOrigin {
    pub module: ModuleId,
    pub block: Option<BlockId>,
}

#[derive(Debug, Clone)]
pub struct ChunkGroup {
    pub(crate) key: ChunkGroupKey,
    pub(crate) kind: ChunkGroupKind,
    pub(crate) chunks: Vec<ChunkKey>,
    pub(crate) parents: IndexSet<ChunkGroupKey>,
    pub(crate) children: IndexSet<ChunkGroupKey>,
    /// Loads that would close a cycle; kept out of the parent/child DAG
    pub(crate) back_parents: IndexSet<ChunkGroupKey>,
    pub(crate) back_children: IndexSet<ChunkGroupKey>,
    pub(crate) origins: Vec<GroupOrigin>,
    pub(crate) runtime: RuntimeSpec,
}

impl ChunkGroup {
    pub(crate) fn new(key: ChunkGroupKey, kind: ChunkGroupKind) -> Self {
        Self {
            key,
            kind,
            chunks: Vec::new(),
            parents: IndexSet::new(),
            children: IndexSet::new(),
            back_parents: IndexSet::new(),
            back_children: IndexSet::new(),
            origins: Vec::new(),
            runtime: RuntimeSpec::new(),
        }
    }

    pub fn key(&self) -> ChunkGroupKey {
        self.key
    }

    pub fn kind(&self) -> &ChunkGroupKind {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ChunkGroupKind::Entrypoint { name, .. } => Some(name),
            ChunkGroupKind::Async { name } => name.as_deref(),
        }
    }

    /// Entrypoints are loaded on page load
    pub fn is_initial(&self) -> bool {
        matches!(self.kind, ChunkGroupKind::Entrypoint { .. })
    }

    pub fn chunks(&self) -> &[ChunkKey] {
        &self.chunks
    }

    pub fn parents(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.parents.iter().copied()
    }

    pub fn children(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.children.iter().copied()
    }

    /// Groups that also load this one through a cyclic async import
    pub fn back_parents(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.back_parents.iter().copied()
    }

    pub fn back_children(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.back_children.iter().copied()
    }

    /// DAG parents followed by back parents
    pub fn loaders(&self) -> impl Iterator<Item = ChunkGroupKey> + '_ {
        self.parents().chain(self.back_parents())
    }

    pub fn origins(&self) -> &[GroupOrigin] {
        &self.origins
    }

    pub fn runtime(&self) -> &RuntimeSpec {
        &self.runtime
    }

    pub fn entrypoint_chunk(&self) -> Option<ChunkKey> {
        match self.kind {
            ChunkGroupKind::Entrypoint {
                entrypoint_chunk, ..
            } => Some(entrypoint_chunk),
            ChunkGroupKind::Async { .. } => None,
        }
    }

    pub fn runtime_chunk(&self) -> Option<ChunkKey> {
        match self.kind {
            ChunkGroupKind::Entrypoint { runtime_chunk, .. } => Some(runtime_chunk),
            ChunkGroupKind::Async { .. } => None,
        }
    }

    pub(crate) fn set_runtime_chunk(&mut self, chunk: ChunkKey) {
        if let ChunkGroupKind::Entrypoint { runtime_chunk, .. } = &mut self.kind {
            *runtime_chunk = chunk;
        }
    }

    pub fn contains_chunk(&self, chunk: ChunkKey) -> bool {
        self.chunks.contains(&chunk)
    }

    pub(crate) fn push_chunk(&mut self, chunk: ChunkKey) -> bool {
        if self.contains_chunk(chunk) {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub(crate) fn unshift_chunk(&mut self, chunk: ChunkKey) -> bool {
        if self.contains_chunk(chunk) {
            return false;
        }
        self.chunks.insert(0, chunk);
        true
    }

    /// Insert `chunk` right before `before`, or at the end if `before` is absent
    pub(crate) fn insert_chunk_before(&mut self, chunk: ChunkKey, before: ChunkKey) -> bool {
        if self.contains_chunk(chunk) {
            return false;
        }
        match self.chunks.iter().position(|c| *c == before) {
            Some(pos) => self.chunks.insert(pos, chunk),
            None => self.chunks.push(chunk),
        }
        true
    }

    /// Replace `old` with `new`; when `new` is already present `old` is just dropped
    pub(crate) fn replace_chunk(&mut self, old: ChunkKey, new: ChunkKey) -> bool {
        let Some(pos) = self.chunks.iter().position(|c| *c == old) else {
            return false;
        };
        if self.contains_chunk(new) {
            self.chunks.remove(pos);
        } else {
            self.chunks[pos] = new;
        }
        true
    }

    pub(crate) fn remove_chunk(&mut self, chunk: ChunkKey) -> bool {
        let before = self.chunks.len();
        self.chunks.retain(|c| *c != chunk);
        self.chunks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn async_group() -> ChunkGroup {
        ChunkGroup::new(ChunkGroupKey::from_index(0), ChunkGroupKind::Async { name: None })
    }

    #[test]
    fn test_insert_before_keeps_order() {
        let mut group = async_group();
        let (a, b, c) = (
            ChunkKey::from_index(0),
            ChunkKey::from_index(1),
            ChunkKey::from_index(2),
        );
        group.push_chunk(a);
        group.push_chunk(b);
        assert!(group.insert_chunk_before(c, b));
        assert!(!group.insert_chunk_before(c, a));
        assert_eq!(group.chunks(), &[a, c, b]);
    }

    #[test]
    fn test_replace_chunk_dedupes() {
        let mut group = async_group();
        let (a, b) = (ChunkKey::from_index(0), ChunkKey::from_index(1));
        group.push_chunk(a);
        group.push_chunk(b);
        assert!(group.replace_chunk(a, b));
        assert_eq!(group.chunks(), &[b]);
        assert!(!group.replace_chunk(a, b));
    }
}
