//! Build command implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::{debug, info};

use crate::bundler::{BuildOutput, Bundler};
use crate::config::Config;
use crate::graph::ModuleGraph;
use crate::ids::{IdPolicy, IdRecords};
use crate::stats::Stats;
use crate::utils::{format_duration, format_size};

/// Build, optimize and seal the chunk graph
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Module graph JSON produced by the resolver
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Write stats JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Module id policy (natural, named, deterministic, size)
    #[arg(long)]
    pub module_ids: Option<IdPolicy>,

    /// Chunk id policy (natural, named, deterministic, size)
    #[arg(long)]
    pub chunk_ids: Option<IdPolicy>,

    /// Records file: ids are read from it when present and written back
    #[arg(long)]
    pub records: Option<PathBuf>,
}

impl BuildCommand {
    pub async fn execute(&self, config_path: &str) -> Result<()> {
        let config = load_config(Path::new(config_path))?;

        info!("Reading module graph from {}", self.graph.display());
        let json = tokio::fs::read_to_string(&self.graph)
            .await
            .with_context(|| format!("Failed to read module graph: {}", self.graph.display()))?;
        let mut graph = ModuleGraph::from_json(&json)
            .with_context(|| format!("Invalid module graph: {}", self.graph.display()))?;
        config.apply_entrypoints(&mut graph)?;

        let mut options = config.bundler_options()?;
        if let Some(policy) = self.module_ids {
            options.ids.module_ids = policy;
        }
        if let Some(policy) = self.chunk_ids {
            options.ids.chunk_ids = policy;
        }

        let records_path = self.records.clone().or_else(|| config.records_path());
        if let Some(path) = &records_path {
            if path.exists() {
                options.ids.records = Some(IdRecords::load(path).await?);
            }
        }

        eprintln!("{} Building chunk graph...", "→".blue());

        let mut bundler = Bundler::new(options);
        for plugin in config.plugins()? {
            bundler = bundler.with_plugin(plugin);
        }
        let output = bundler.run(&graph)?;

        print_summary(&output, &graph);

        let stats = Stats::from_sealed(&output.sealed, &graph);
        if let Some(out) = &self.out {
            tokio::fs::write(out, stats.to_json()?)
                .await
                .with_context(|| format!("Failed to write stats: {}", out.display()))?;
            eprintln!("  {} Wrote {}", "✓".green(), out.display().to_string().cyan());
        }
        if let Some(path) = &records_path {
            output.sealed.records().save(path).await?;
            debug!("Saved records to {}", path.display());
        }

        eprintln!();
        Ok(())
    }
}

/// Use the config file when present, defaults otherwise
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        info!("Loading configuration from {}", path.display());
        Config::load(path)
    } else {
        debug!("No config at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

fn print_summary(output: &BuildOutput, graph: &ModuleGraph) {
    let sealed = &output.sealed;
    let chunk_graph = sealed.chunk_graph();

    eprintln!(
        "\n{} Sealed {} chunk(s) from {} module(s) in {}\n",
        "✓".green().bold(),
        chunk_graph.chunk_count(),
        chunk_graph.chunked_modules().len(),
        format_duration(output.duration)
    );

    for chunk in sealed.chunks() {
        let key = chunk.key();
        let id = sealed.chunk_id(key).map(ToString::to_string).unwrap_or_default();
        let kind = if chunk_graph.can_be_initial(key) { "initial" } else { "async" };
        eprintln!(
            "  {} {} {} {} {}",
            "•".dimmed(),
            id.cyan(),
            chunk.name().unwrap_or("-"),
            format!("[{}]", kind).dimmed(),
            format!("{} in {} module(s)", format_size(chunk_graph.chunk_size(key, graph)), chunk.len()).dimmed()
        );
    }

    for (name, chunks) in sealed.entrypoints() {
        let ids: Vec<String> = chunks
            .iter()
            .filter_map(|c| sealed.chunk_id(*c).map(ToString::to_string))
            .collect();
        eprintln!("  {} entrypoint {} = {}", "→".dimmed(), name.bold(), ids.join(" + "));
    }

    for diagnostic in sealed.diagnostics().warnings() {
        eprintln!("  {} {}", "⚠".yellow(), diagnostic);
    }
    eprintln!("\n  hash {}", sealed.full_hash().dimmed());
}
