//! Configuration schema definitions

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::build::RuntimeChunk;
use crate::graph::{ModuleType, OneOrMany};
use crate::ids::IdPolicy;
use crate::optimize::{default_cache_groups, CacheGroup, CacheGroupEffect, ChunkFilter, ModuleTest, SplitChunksOptions};

/// Project metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
        }
    }
}

fn default_name() -> String {
    "my-app".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_true() -> bool {
    true
}

/// An entrypoint: a single import or a descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntrypointConfig {
    Import(String),
    Descriptor {
        import: OneOrMany,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        runtime: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        depend_on: Vec<String>,
    },
}

impl EntrypointConfig {
    pub fn imports(&self) -> Vec<String> {
        match self {
            EntrypointConfig::Import(import) => vec![import.clone()],
            EntrypointConfig::Descriptor { import, .. } => import.to_vec(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Hex characters kept from every hash
    #[serde(default = "default_hash_digest_length")]
    pub hash_digest_length: usize,

    /// Records file read before and written after each build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            hash_digest_length: default_hash_digest_length(),
            records: None,
        }
    }
}

fn default_hash_digest_length() -> usize {
    20
}

/// `runtime_chunk = "single" | "multiple" | true | false | "<template>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeChunkConfig {
    Enabled(bool),
    Name(String),
}

impl From<&RuntimeChunkConfig> for RuntimeChunk {
    fn from(config: &RuntimeChunkConfig) -> Self {
        match config {
            RuntimeChunkConfig::Enabled(false) => RuntimeChunk::None,
            RuntimeChunkConfig::Enabled(true) => RuntimeChunk::Multiple,
            RuntimeChunkConfig::Name(name) => match name.as_str() {
                "single" => RuntimeChunk::Single,
                "multiple" => RuntimeChunk::Multiple,
                template => RuntimeChunk::Named(template.to_string()),
            },
        }
    }
}

/// Optimization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default)]
    pub module_ids: IdPolicy,

    #[serde(default)]
    pub chunk_ids: IdPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_chunk: Option<RuntimeChunkConfig>,

    #[serde(default = "default_true")]
    pub remove_available_modules: bool,

    #[serde(default = "default_true")]
    pub remove_empty_chunks: bool,

    #[serde(default = "default_true")]
    pub merge_duplicate_chunks: bool,

    #[serde(default)]
    pub split_chunks: SplitChunksConfig,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            module_ids: IdPolicy::default(),
            chunk_ids: IdPolicy::default(),
            runtime_chunk: None,
            remove_available_modules: true,
            remove_empty_chunks: true,
            merge_duplicate_chunks: true,
            split_chunks: SplitChunksConfig::default(),
        }
    }
}

/// Split chunks configuration; unset values keep the built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitChunksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_remaining_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_async_requests: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_initial_requests: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce_size_threshold: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_name_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<usize>,

    /// Cache groups in declaration order; `false` disables a default group
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub cache_groups: IndexMap<String, CacheGroupEntry>,
}

impl Default for SplitChunksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunks: None,
            min_size: None,
            min_remaining_size: None,
            max_size: None,
            fallback_max_size: None,
            min_chunks: None,
            max_async_requests: None,
            max_initial_requests: None,
            enforce_size_threshold: None,
            automatic_name_delimiter: None,
            max_passes: None,
            cache_groups: IndexMap::new(),
        }
    }
}

impl SplitChunksConfig {
    /// `None` when split chunks is disabled
    pub fn to_options(&self) -> Result<Option<SplitChunksOptions>> {
        if !self.enabled {
            return Ok(None);
        }

        let mut options = SplitChunksOptions::default();
        if let Some(chunks) = &self.chunks {
            options.chunks = parse_chunk_filter(chunks)?;
        }
        if let Some(v) = self.min_size {
            options.min_size = v;
        }
        if let Some(v) = self.min_remaining_size {
            options.min_remaining_size = Some(v);
        }
        if let Some(v) = self.max_size {
            options.max_size = Some(v);
        }
        if let Some(v) = self.fallback_max_size {
            options.fallback_max_size = Some(v);
        }
        if let Some(v) = self.min_chunks {
            options.min_chunks = v;
        }
        if let Some(v) = self.max_async_requests {
            options.max_async_requests = v;
        }
        if let Some(v) = self.max_initial_requests {
            options.max_initial_requests = v;
        }
        if let Some(v) = self.enforce_size_threshold {
            options.enforce_size_threshold = v;
        }
        if let Some(v) = &self.automatic_name_delimiter {
            options.automatic_name_delimiter = v.clone();
        }
        if let Some(v) = self.max_passes {
            options.max_passes = v;
        }

        // configured groups override defaults in place, new ones are appended
        let mut groups: IndexMap<String, CacheGroup> = default_cache_groups()
            .into_iter()
            .map(|group| (group.key.clone(), group))
            .collect();
        for (key, entry) in &self.cache_groups {
            match entry {
                CacheGroupEntry::Enabled(false) => {
                    groups.shift_remove(key);
                }
                CacheGroupEntry::Enabled(true) => {
                    groups.entry(key.clone()).or_insert_with(|| CacheGroup::new(key.clone()));
                }
                CacheGroupEntry::Group(config) => {
                    let group = config
                        .to_cache_group(key)
                        .with_context(|| format!("Invalid cache group '{}'", key))?;
                    groups.insert(key.clone(), group);
                }
            }
        }
        options.cache_groups = groups.into_values().collect();

        Ok(Some(options))
    }
}

fn parse_chunk_filter(value: &str) -> Result<ChunkFilter> {
    match ChunkFilter::parse(value) {
        Some(filter) => Ok(filter),
        None => bail!("Unknown chunks filter '{}', expected initial, async or all", value),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheGroupEntry {
    Enabled(bool),
    Group(CacheGroupConfig),
}

/// One cache group; several tests must all match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheGroupConfig {
    /// Regex over the module identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Glob over the cleaned module path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_remaining_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_async_requests: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_initial_requests: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforce: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_existing_chunk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl CacheGroupConfig {
    pub fn to_cache_group(&self, key: &str) -> Result<CacheGroup> {
        let mut group = CacheGroup::new(key);

        if let Some(pattern) = &self.test {
            let test = ModuleTest::regex(pattern).with_context(|| format!("Invalid test regex '{}'", pattern))?;
            group = group.test(test);
        }
        if let Some(pattern) = &self.glob {
            let test = ModuleTest::glob(pattern).with_context(|| format!("Invalid glob '{}'", pattern))?;
            group = group.test(test);
        }
        if let Some(module_type) = self.module_type {
            group = group.test(ModuleTest::Type(module_type));
        }
        if let Some(chunks) = &self.chunks {
            group = group.chunks(parse_chunk_filter(chunks)?);
        }

        let effects = [
            self.min_size.map(CacheGroupEffect::MinSize),
            self.max_size.map(CacheGroupEffect::MaxSize),
            self.min_chunks.map(CacheGroupEffect::MinChunks),
            self.min_remaining_size.map(CacheGroupEffect::MinRemainingSize),
            self.max_async_requests.map(CacheGroupEffect::MaxAsyncRequests),
            self.max_initial_requests.map(CacheGroupEffect::MaxInitialRequests),
            self.priority.map(CacheGroupEffect::Priority),
            self.enforce.map(CacheGroupEffect::Enforce),
            self.reuse_existing_chunk.map(CacheGroupEffect::ReuseExistingChunk),
            self.id_hint.clone().map(CacheGroupEffect::IdHint),
            self.filename.clone().map(CacheGroupEffect::Filename),
        ];
        for effect in effects.into_iter().flatten() {
            group = group.effect(effect);
        }
        if let Some(name) = &self.name {
            group = group.name(name.clone());
        }

        Ok(group)
    }
}

/// Plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin name/identifier
    pub name: String,

    /// Plugin-specific options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<toml::Table>,
}
