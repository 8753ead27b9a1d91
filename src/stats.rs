//! Serializable build statistics

use indexmap::IndexMap;
use serde::Serialize;

use crate::chunk_graph::ChunkKey;
use crate::diagnostics::{Diagnostic, Severity};
use crate::graph::ModuleGraph;
use crate::ids::{Id, SealedChunkGraph};

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub hash: String,
    pub entrypoints: IndexMap<String, EntrypointStats>,
    pub chunks: Vec<ChunkStats>,
    pub modules: Vec<ModuleStats>,
    pub diagnostics: Vec<DiagnosticStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntrypointStats {
    /// Chunk ids in load order
    pub chunks: Vec<Id>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkStats {
    pub id: Id,
    pub hash: String,
    pub name: Option<String>,
    pub initial: bool,
    pub entry: bool,
    pub runtime: Vec<String>,
    pub size: u64,
    pub modules: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleStats {
    pub id: Id,
    pub identifier: String,
    pub size: u64,
    pub hash: String,
    pub chunks: Vec<Id>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticStats {
    pub severity: Severity,
    pub message: String,
}

impl From<&Diagnostic> for DiagnosticStats {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            severity: diagnostic.severity,
            message: diagnostic.to_string(),
        }
    }
}

impl Stats {
    pub fn from_sealed(sealed: &SealedChunkGraph, modules: &ModuleGraph) -> Self {
        let chunk_graph = sealed.chunk_graph();
        let chunk_id = |key: ChunkKey| sealed.chunk_id(key).cloned().unwrap_or(Id::Number(0));

        let entrypoints = sealed
            .entrypoints()
            .map(|(name, chunks)| {
                (
                    name.to_string(),
                    EntrypointStats {
                        chunks: chunks.iter().map(|c| chunk_id(*c)).collect(),
                    },
                )
            })
            .collect();

        let mut chunks: Vec<ChunkStats> = sealed
            .chunks()
            .map(|chunk| {
                let key = chunk.key();
                ChunkStats {
                    id: chunk_id(key),
                    hash: sealed.chunk_hash(key).unwrap_or_default().to_string(),
                    name: chunk.name().map(str::to_string),
                    initial: chunk_graph.can_be_initial(key),
                    entry: chunk.has_entry_module(),
                    runtime: sealed.chunk_runtime(key).iter().map(str::to_string).collect(),
                    size: chunk_graph.chunk_size(key, modules),
                    modules: sealed
                        .chunk_modules(key)
                        .into_iter()
                        .map(|m| modules.module(m).identifier.clone())
                        .collect(),
                    id_hints: chunk.id_name_hints().map(str::to_string).collect(),
                    cache_group: chunk.cache_group().map(str::to_string),
                    filename: chunk.filename_template().map(str::to_string),
                }
            })
            .collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));

        let mut module_stats: Vec<ModuleStats> = chunk_graph
            .chunked_modules()
            .into_iter()
            .filter_map(|m| {
                let module = modules.module(m);
                let mut in_chunks: Vec<Id> = chunk_graph.module_chunks(m).map(chunk_id).collect();
                in_chunks.sort();
                Some(ModuleStats {
                    id: sealed.module_id(m)?.clone(),
                    identifier: module.identifier.clone(),
                    size: module.size,
                    hash: sealed.module_hash(m)?.to_string(),
                    chunks: in_chunks,
                })
            })
            .collect();
        module_stats.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        Self {
            hash: sealed.full_hash().to_string(),
            entrypoints,
            chunks,
            modules: module_stats,
            diagnostics: sealed.diagnostics().iter().map(DiagnosticStats::from).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Bundler, BundlerOptions};
    use crate::graph::{Entry, Module};
    use crate::ids::IdPolicy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stats_for_lazy_import() {
        let mut graph = ModuleGraph::new();
        let a = graph.add_module(Module::new("./src/index.js").with_size(100)).unwrap();
        let b = graph.add_module(Module::new("./src/lazy.js").with_size(50)).unwrap();
        graph.add_dynamic_import(a, b, Some("lazy")).unwrap();
        graph.add_entry(Entry::new("main", a)).unwrap();

        let mut options = BundlerOptions::default();
        options.ids.chunk_ids = IdPolicy::Named;
        options.ids.module_ids = IdPolicy::Named;
        let output = Bundler::new(options).run(&graph).unwrap();
        let stats = Stats::from_sealed(&output.sealed, &graph);

        assert_eq!(stats.entrypoints["main"].chunks, vec![Id::Name("main".into())]);
        assert_eq!(stats.chunks.len(), 2);

        let lazy = stats.chunks.iter().find(|c| c.name.as_deref() == Some("lazy")).unwrap();
        assert!(!lazy.initial);
        assert!(!lazy.entry);
        assert_eq!(lazy.size, 50);
        assert_eq!(lazy.runtime, vec!["main".to_string()]);
        assert_eq!(lazy.modules, vec!["./src/lazy.js".to_string()]);

        assert_eq!(stats.modules.len(), 2);
        assert_eq!(stats.modules[1].chunks, vec![Id::Name("lazy".into())]);

        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(json["chunks"][0]["id"], "lazy");
        assert!(json["chunks"][0].get("cache_group").is_none());
    }
}
