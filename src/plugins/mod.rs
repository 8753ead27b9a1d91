//! Plugin system
//!
//! Plugins contribute cache groups before optimization and observe the sealed
//! chunk graph afterwards. Cache groups from plugins are registered after the
//! configured ones, so configured groups win ties on equal priority.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::graph::ModuleType;
use crate::ids::SealedChunkGraph;
use crate::optimize::{CacheGroup, ChunkFilter, ModuleTest};

/// Plugin trait - implement this to extend chunk graph construction
pub trait Plugin: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Extra cache groups for split chunks
    fn cache_groups(&self) -> Vec<CacheGroup> {
        Vec::new()
    }

    /// Called once ids and hashes are assigned
    fn after_seal(&self, _sealed: &SealedChunkGraph) -> Result<()> {
        Ok(())
    }
}

/// Plugin manager
#[derive(Default, Clone)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        debug!("Registered plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Cache groups of every plugin, in registration order
    pub fn cache_groups(&self) -> Vec<CacheGroup> {
        self.plugins.iter().flat_map(|p| p.cache_groups()).collect()
    }

    /// Run after_seal hooks
    pub fn run_after_seal(&self, sealed: &SealedChunkGraph) -> Result<()> {
        for plugin in &self.plugins {
            plugin.after_seal(sealed)?;
        }
        Ok(())
    }
}

/// Styles plugin - pulls every CSS module into one `styles` chunk
pub struct StylesPlugin {
    name: String,
}

impl StylesPlugin {
    pub fn new() -> Self {
        Self {
            name: "styles".to_string(),
        }
    }

    pub fn with_chunk_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for StylesPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for StylesPlugin {
    fn name(&self) -> &str {
        "styles"
    }

    fn cache_groups(&self) -> Vec<CacheGroup> {
        vec![CacheGroup::new("styles")
            .test(ModuleTest::Type(ModuleType::Css))
            .chunks(ChunkFilter::All)
            .name(self.name.clone())
            .enforce(true)]
    }
}
