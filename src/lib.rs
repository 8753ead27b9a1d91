//! Component chunk graph core
//!
//! Turns a module dependency graph into a chunk graph in three phases:
//! [`build`] assigns modules to chunks and chunk groups, [`optimize`]
//! extracts shared chunks and cleans up, and [`ids`] seals the graph with
//! stable ids and content hashes. [`bundler::Bundler`] runs all three.

pub mod build;
pub mod bundler;
pub mod chunk_graph;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod ids;
pub mod optimize;
pub mod plugins;
pub mod stats;
pub mod utils;

pub use bundler::{BuildOutput, Bundler, BundlerOptions};
pub use chunk_graph::ChunkGraph;
pub use cli::Cli;
pub use config::Config;
pub use graph::ModuleGraph;
pub use ids::SealedChunkGraph;
