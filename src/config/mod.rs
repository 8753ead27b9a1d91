//! Configuration handling for Component
//!
//! Parses component.toml and turns it into typed bundler options.

mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::build::{BuildOptions, RuntimeChunk};
use crate::bundler::BundlerOptions;
use crate::graph::{Entry, ModuleGraph};
use crate::ids::IdOptions;
use crate::optimize::OptimizationOptions;
use crate::plugins::{Plugin, StylesPlugin};

pub use schema::*;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata
    #[serde(default)]
    pub project: ProjectConfig,

    /// Entries added to (or replacing those of) the module graph
    #[serde(default)]
    pub entrypoints: IndexMap<String, EntrypointConfig>,

    /// Chunking and id settings
    #[serde(default)]
    pub optimization: OptimizationConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Plugin configuration
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let canonical_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config = Self::parse(&content)?;

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(config)
    }

    /// Parse and validate component.toml content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse component.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.output.hash_digest_length == 0 || self.output.hash_digest_length > 64 {
            bail!(
                "output.hash_digest_length must be between 1 and 64, got {}",
                self.output.hash_digest_length
            );
        }

        for (name, entry) in &self.entrypoints {
            if entry.imports().is_empty() {
                bail!("Entrypoint '{}' has no imports", name);
            }
            if let EntrypointConfig::Descriptor { runtime: Some(_), depend_on, .. } = entry {
                if !depend_on.is_empty() {
                    bail!("Entrypoint '{}' cannot set both runtime and depend_on", name);
                }
            }
        }

        // surfaces bad regexes, globs and filters early
        self.optimization.split_chunks.to_options()?;
        self.plugins()?;

        Ok(())
    }

    /// Typed options for every phase
    pub fn bundler_options(&self) -> Result<BundlerOptions> {
        let optimization = &self.optimization;
        Ok(BundlerOptions {
            build: BuildOptions {
                remove_available_modules: optimization.remove_available_modules,
                runtime_chunk: optimization
                    .runtime_chunk
                    .as_ref()
                    .map(RuntimeChunk::from)
                    .unwrap_or_default(),
            },
            optimization: OptimizationOptions {
                remove_empty_chunks: optimization.remove_empty_chunks,
                merge_duplicate_chunks: optimization.merge_duplicate_chunks,
                split_chunks: optimization.split_chunks.to_options()?,
            },
            ids: IdOptions {
                module_ids: optimization.module_ids,
                chunk_ids: optimization.chunk_ids,
                hash_digest_length: self.output.hash_digest_length,
                records: None,
            },
        })
    }

    /// Add the configured entrypoints to a module graph
    pub fn apply_entrypoints(&self, graph: &mut ModuleGraph) -> Result<()> {
        for (name, config) in &self.entrypoints {
            let mut modules = Vec::new();
            for import in config.imports() {
                let id = graph
                    .get_module_id(&import)
                    .with_context(|| format!("Entrypoint '{}' imports unknown module '{}'", name, import))?;
                modules.push(id);
            }

            let mut entry = Entry {
                name: name.clone(),
                modules,
                runtime: None,
                depend_on: Vec::new(),
            };
            if let EntrypointConfig::Descriptor { runtime, depend_on, .. } = config {
                entry.runtime = runtime.clone();
                entry.depend_on = depend_on.clone();
            }
            graph.upsert_entry(entry)?;
        }
        Ok(())
    }

    /// Instantiate the configured plugins
    pub fn plugins(&self) -> Result<Vec<Arc<dyn Plugin>>> {
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();
        for config in &self.plugins {
            match config.name.as_str() {
                "styles" => {
                    let mut plugin = StylesPlugin::new();
                    if let Some(name) = config
                        .options
                        .as_ref()
                        .and_then(|o| o.get("chunk_name"))
                        .and_then(|v| v.as_str())
                    {
                        plugin = plugin.with_chunk_name(name);
                    }
                    plugins.push(Arc::new(plugin));
                }
                other => bail!("Unknown plugin '{}'", other),
            }
        }
        Ok(plugins)
    }

    /// Records file, relative to the config root
    pub fn records_path(&self) -> Option<PathBuf> {
        self.output.records.as_ref().map(|p| self.root.join(p))
    }
}
