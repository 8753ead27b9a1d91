//! Bundler pipeline
//!
//! Runs the three phases in order on an owned graph:
//! build the chunk graph, optimize it, then seal it with ids and hashes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::info;

use crate::build::{build_chunk_graph, BuildOptions};
use crate::graph::ModuleGraph;
use crate::ids::{seal, IdOptions, SealedChunkGraph};
use crate::optimize::{OptimizationOptions, OptimizationReport, Optimizer};
use crate::plugins::{Plugin, PluginManager};
use crate::utils::format_duration;

/// Options for every phase
#[derive(Debug, Clone, Default)]
pub struct BundlerOptions {
    pub build: BuildOptions,
    pub optimization: OptimizationOptions,
    pub ids: IdOptions,
}

/// Result of a bundler run
#[derive(Debug)]
pub struct BuildOutput {
    /// Final chunk graph
    pub sealed: SealedChunkGraph,

    /// What the optimizer did
    pub optimization: OptimizationReport,

    /// Wall time of the whole pipeline
    pub duration: Duration,
}

/// The main bundler
pub struct Bundler {
    options: BundlerOptions,
    plugins: PluginManager,
}

impl Bundler {
    pub fn new(options: BundlerOptions) -> Self {
        Self {
            options,
            plugins: PluginManager::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    /// Run build, optimize and seal
    pub fn run(&self, modules: &ModuleGraph) -> Result<BuildOutput> {
        let start = Instant::now();

        info!("Building chunk graph...");
        let chunk_graph =
            build_chunk_graph(modules, self.options.build.clone()).context("Failed to build chunk graph")?;

        info!("Optimizing chunks...");
        let (chunk_graph, optimization) = Optimizer::new(modules, &self.options.optimization)
            .with_cache_groups(self.plugins.cache_groups())
            .optimize(chunk_graph);

        info!("Assigning ids...");
        let sealed = seal(chunk_graph, modules, &self.options.ids);
        self.plugins.run_after_seal(&sealed)?;

        let duration = start.elapsed();
        info!(
            "Sealed {} chunks in {} ({} warnings)",
            sealed.chunks().count(),
            format_duration(duration),
            sealed.diagnostics().warnings().count()
        );

        Ok(BuildOutput {
            sealed,
            optimization,
            duration,
        })
    }
}
