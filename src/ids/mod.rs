//! Id and hash assignment
//!
//! [`seal`] consumes an optimized [`ChunkGraph`] and returns a
//! [`SealedChunkGraph`] where every chunk and every chunked module carries an
//! id and a content hash. Nothing can be restructured after this point.

mod assign;
mod hash;
mod naming;
mod records;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk_graph::{Chunk, ChunkGraph, ChunkKey, RuntimeSpec};
use crate::diagnostics::Diagnostics;
use crate::graph::{ModuleGraph, ModuleId};
use crate::utils::format_duration;

pub use records::IdRecords;

/// A module or chunk id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Name(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Name(name) => f.write_str(name),
        }
    }
}

/// How ids are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdPolicy {
    /// Graph order for modules, creation order for chunks
    Natural,
    /// Readable names
    Named,
    /// Hashed names, stable across unrelated changes
    #[default]
    Deterministic,
    /// Most used first
    Size,
}

impl IdPolicy {
    /// Whether a recorded id has the shape this policy produces
    fn accepts(self, id: &Id) -> bool {
        match self {
            IdPolicy::Named => matches!(id, Id::Name(_)),
            _ => matches!(id, Id::Number(_)),
        }
    }
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "natural" => Ok(IdPolicy::Natural),
            "named" => Ok(IdPolicy::Named),
            "deterministic" => Ok(IdPolicy::Deterministic),
            "size" => Ok(IdPolicy::Size),
            other => Err(format!(
                "unknown id policy '{}', expected natural, named, deterministic or size",
                other
            )),
        }
    }
}

impl fmt::Display for IdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdPolicy::Natural => "natural",
            IdPolicy::Named => "named",
            IdPolicy::Deterministic => "deterministic",
            IdPolicy::Size => "size",
        })
    }
}

#[derive(Debug, Clone)]
pub struct IdOptions {
    pub module_ids: IdPolicy,
    pub chunk_ids: IdPolicy,
    /// Hex characters kept from each digest
    pub hash_digest_length: usize,
    /// Ids from a previous build
    pub records: Option<IdRecords>,
}

impl Default for IdOptions {
    fn default() -> Self {
        Self {
            module_ids: IdPolicy::Deterministic,
            chunk_ids: IdPolicy::Deterministic,
            hash_digest_length: 20,
            records: None,
        }
    }
}

/// Final, read-only chunk graph with ids and hashes
#[derive(Debug, Clone)]
pub struct SealedChunkGraph {
    chunk_graph: ChunkGraph,
    module_ids: FxHashMap<ModuleId, Id>,
    module_hashes: FxHashMap<ModuleId, String>,
    chunk_ids: FxHashMap<ChunkKey, Id>,
    chunk_hashes: FxHashMap<ChunkKey, String>,
    entrypoints: IndexMap<String, Vec<ChunkKey>>,
    full_hash: String,
    records: IdRecords,
}

impl SealedChunkGraph {
    /// Chunks in creation order
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunk_graph.chunks()
    }

    /// Modules of a chunk sorted by id
    pub fn chunk_modules(&self, chunk: ChunkKey) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self.chunk_graph.chunk(chunk).modules().collect();
        modules.sort_by(|a, b| self.module_ids.get(a).cmp(&self.module_ids.get(b)));
        modules
    }

    pub fn chunk_id(&self, chunk: ChunkKey) -> Option<&Id> {
        self.chunk_ids.get(&chunk)
    }

    pub fn chunk_hash(&self, chunk: ChunkKey) -> Option<&str> {
        self.chunk_hashes.get(&chunk).map(String::as_str)
    }

    pub fn chunk_runtime(&self, chunk: ChunkKey) -> &RuntimeSpec {
        self.chunk_graph.chunk(chunk).runtime()
    }

    /// Entrypoint names in declaration order with their chunks in load order
    pub fn entrypoints(&self) -> impl Iterator<Item = (&str, &[ChunkKey])> {
        self.entrypoints.iter().map(|(name, chunks)| (name.as_str(), chunks.as_slice()))
    }

    pub fn entrypoint_chunks(&self, name: &str) -> Option<&[ChunkKey]> {
        self.entrypoints.get(name).map(Vec::as_slice)
    }

    pub fn module_id(&self, module: ModuleId) -> Option<&Id> {
        self.module_ids.get(&module)
    }

    pub fn module_hash(&self, module: ModuleId) -> Option<&str> {
        self.module_hashes.get(&module).map(String::as_str)
    }

    pub fn full_hash(&self) -> &str {
        &self.full_hash
    }

    /// Records to feed into the next build
    pub fn records(&self) -> &IdRecords {
        &self.records
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.chunk_graph.diagnostics()
    }

    /// The underlying graph, for group level queries
    pub fn chunk_graph(&self) -> &ChunkGraph {
        &self.chunk_graph
    }
}

/// Assign ids and hashes
pub fn seal(chunk_graph: ChunkGraph, modules: &ModuleGraph, options: &IdOptions) -> SealedChunkGraph {
    let start = Instant::now();
    let len = options.hash_digest_length;
    let previous = options.records.as_ref();

    let module_items = naming::ordered_modules(&chunk_graph, modules, options.module_ids);
    let module_ids = assign::assign_ids(&module_items, options.module_ids, previous.map(|r| &r.modules));

    let chunk_items = naming::ordered_chunks(&chunk_graph, modules, options.chunk_ids);
    let chunk_ids = assign::assign_ids(&chunk_items, options.chunk_ids, previous.map(|r| &r.chunks));

    let module_hashes: FxHashMap<ModuleId, String> = module_items
        .iter()
        .map(|(m, _)| (*m, hash::module_hash(modules, *m, len)))
        .collect();
    let chunk_hashes = hash::chunk_hashes(&chunk_graph, modules, &chunk_ids, &module_hashes, len);
    let full_hash = hash::full_hash(&chunk_ids, &chunk_hashes, len);

    let mut records = IdRecords::default();
    for (module, name) in &module_items {
        if let Some(id) = module_ids.get(module) {
            records.modules.insert(name.clone(), id.clone());
        }
    }
    for (chunk, name) in &chunk_items {
        if let Some(id) = chunk_ids.get(chunk) {
            records.chunks.insert(name.clone(), id.clone());
        }
    }

    let entrypoints = chunk_graph
        .entrypoints()
        .map(|(name, group)| (name.to_string(), chunk_graph.group(group).chunks().to_vec()))
        .collect();

    info!(
        "Assigned ids to {} modules and {} chunks (hash {})",
        module_ids.len(),
        chunk_ids.len(),
        full_hash
    );
    debug!("Id assignment finished in {}", format_duration(start.elapsed()));

    SealedChunkGraph {
        chunk_graph,
        module_ids,
        module_hashes,
        chunk_ids,
        chunk_hashes,
        entrypoints,
        full_hash,
        records,
    }
}
