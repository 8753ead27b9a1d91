//! Id records carried between builds

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Id;

/// Ids handed out by a previous build, keyed by stable names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRecords {
    /// Module identifier -> id
    #[serde(default)]
    pub modules: BTreeMap<String, Id>,

    /// Chunk name (or derived name) -> id
    #[serde(default)]
    pub chunks: BTreeMap<String, Id>,
}

impl IdRecords {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.chunks.is_empty()
    }

    /// Load records written by a previous run
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read records: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse records: {}", path.display()))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write records: {}", path.display()))
    }
}
