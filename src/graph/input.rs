//! JSON representation of a module graph
//!
//! ```json
//! {
//!   "modules": [
//!     { "identifier": "./src/main.js", "size": 120,
//!       "dependencies": ["./src/a.js", { "target": "./src/b.js", "kind": "weak" }],
//!       "blocks": [{ "chunkName": "lazy", "dependencies": ["./src/lazy.js"] }] }
//!   ],
//!   "entries": [{ "name": "main", "import": "./src/main.js" }]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{Dependency, DependencyKind, Entry, Module, ModuleGraph, ModuleId, ModuleType};
use crate::error::GraphError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphInput {
    pub modules: Vec<ModuleInput>,
    #[serde(default)]
    pub entries: Vec<EntryInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInput {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleType>,
    #[serde(default)]
    pub dependencies: Vec<DependencyInput>,
    #[serde(default)]
    pub blocks: Vec<BlockInput>,
}

/// A dependency is either a bare target identifier or a detailed object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyInput {
    Target(String),
    Detailed {
        target: String,
        #[serde(default = "default_kind")]
        kind: DependencyKind,
        #[serde(default = "default_true")]
        active: bool,
    },
}

fn default_kind() -> DependencyKind {
    DependencyKind::Sync
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_name: Option<String>,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInput {
    pub name: String,
    pub import: OneOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depend_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

impl GraphInput {
    /// Resolve identifiers and build the arena-backed graph
    pub fn into_graph(self) -> Result<ModuleGraph, GraphError> {
        let mut graph = ModuleGraph::new();

        for input in &self.modules {
            let mut module = Module::new(input.identifier.clone()).with_size(input.size);
            if let Some(name) = &input.name {
                module = module.with_name(name.clone());
            }
            if let Some(hash) = &input.hash {
                module = module.with_hash(hash.clone());
            }
            if let Some(module_type) = input.module_type {
                module = module.with_type(module_type);
            }
            graph.add_module(module)?;
        }

        let lookup = |graph: &ModuleGraph, identifier: &str, referenced_by: &str| {
            graph
                .get_module_id(identifier)
                .ok_or_else(|| GraphError::UnknownModule {
                    identifier: identifier.to_string(),
                    referenced_by: referenced_by.to_string(),
                })
        };

        for (index, input) in self.modules.iter().enumerate() {
            let from = ModuleId::from_index(index);
            for dep in &input.dependencies {
                let dependency = match dep {
                    DependencyInput::Target(target) => {
                        Dependency::sync(lookup(&graph, target, &input.identifier)?)
                    }
                    DependencyInput::Detailed {
                        target,
                        kind,
                        active,
                    } => {
                        let target = lookup(&graph, target, &input.identifier)?;
                        let mut dependency = match kind {
                            DependencyKind::Weak => Dependency::weak(target),
                            // Async edges outside a block are treated as their own block
                            DependencyKind::Async => {
                                let block = graph.add_block(from, None)?;
                                Dependency {
                                    target,
                                    kind: DependencyKind::Async,
                                    block: Some(block),
                                    active: true,
                                }
                            }
                            DependencyKind::Sync => Dependency::sync(target),
                        };
                        dependency.active = *active;
                        dependency
                    }
                };
                graph.add_dependency(from, dependency)?;
            }

            for block_input in &input.blocks {
                let block = graph.add_block(from, block_input.chunk_name.clone())?;
                for target in &block_input.dependencies {
                    let target = lookup(&graph, target, &input.identifier)?;
                    graph.add_block_dependency(block, target)?;
                }
            }
        }

        for entry in self.entries {
            let mut modules = Vec::new();
            for identifier in entry.import.to_vec() {
                modules.push(lookup(&graph, &identifier, &format!("entry '{}'", entry.name))?);
            }
            graph.add_entry(Entry {
                name: entry.name,
                modules,
                runtime: entry.runtime,
                depend_on: entry.depend_on,
            })?;
        }

        Ok(graph)
    }
}

impl ModuleGraph {
    /// Parse a JSON module graph
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let input: GraphInput = serde_json::from_str(json)?;
        input.into_graph()
    }
}
