//! Project initialization command

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

/// Write a starter component.toml
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project directory
    #[arg(default_value = ".")]
    pub name: String,

    /// Overwrite an existing component.toml
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.name);
        let config_path = project_dir.join("component.toml");

        if config_path.exists() && !self.force {
            bail!(
                "{} already exists, use --force to overwrite",
                config_path.display()
            );
        }

        if self.name != "." {
            tokio::fs::create_dir_all(project_dir)
                .await
                .context("Failed to create project directory")?;
        }

        tokio::fs::write(&config_path, self.generate_config())
            .await
            .context("Failed to write component.toml")?;
        eprintln!("  {} Created {}", "✓".green(), config_path.display().to_string().cyan());

        eprintln!("\n  Next steps:");
        eprintln!(
            "    {} component-chunks build --graph graph.json --out stats.json",
            "→".dimmed()
        );
        eprintln!();

        Ok(())
    }

    fn generate_config(&self) -> String {
        let name = Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| *n != ".")
            .unwrap_or("my-app");

        format!(
            r#"# Component chunk graph configuration

[project]
name = "{name}"
version = "0.1.0"

# Extra entrypoints, on top of the ones in the module graph
# [entrypoints]
# admin = "./src/admin.js"

[optimization]
module_ids = "deterministic"
chunk_ids = "deterministic"
# runtime_chunk = "single"

[optimization.split_chunks]
chunks = "all"
min_size = 20000
min_chunks = 1
max_async_requests = 30
max_initial_requests = 30
enforce_size_threshold = 50000

# [optimization.split_chunks.cache_groups.vendors]
# test = "[\\/]node_modules[\\/]"
# chunks = "initial"
# priority = 10

[output]
hash_digest_length = 20
"#,
            name = name
        )
    }
}
