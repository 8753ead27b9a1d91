//! Cache groups
//!
//! A cache group is a key plus a list of [`CacheGroupEffect`]s. Effects are
//! applied in order by [`CacheGroup::resolve`], later effects overriding
//! earlier ones, and anything left unset falls back to the
//! [`SplitChunksOptions`] defaults.

use std::fmt;
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chunk_graph::{ChunkGraph, ChunkKey};
use crate::graph::{Module, ModuleType};
use crate::utils::clean_path;

/// Which chunks a cache group may take modules from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkFilter {
    Initial,
    Async,
    #[default]
    All,
}

impl ChunkFilter {
    pub fn accepts(self, chunk_graph: &ChunkGraph, chunk: ChunkKey) -> bool {
        match self {
            ChunkFilter::All => true,
            ChunkFilter::Initial => chunk_graph.can_be_initial(chunk),
            ChunkFilter::Async => !chunk_graph.can_be_initial(chunk),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initial" => Some(ChunkFilter::Initial),
            "async" => Some(ChunkFilter::Async),
            "all" => Some(ChunkFilter::All),
            _ => None,
        }
    }
}

/// Predicate selecting the modules of a cache group
#[derive(Clone)]
pub enum ModuleTest {
    Always,
    /// Matched against the module identifier
    Regex(Regex),
    /// Matched against the cleaned identifier, without query
    Glob(GlobMatcher),
    Type(ModuleType),
    Custom(Arc<dyn Fn(&Module) -> bool + Send + Sync>),
}

impl ModuleTest {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(ModuleTest::Regex(Regex::new(pattern)?))
    }

    pub fn glob(pattern: &str) -> Result<Self, globset::Error> {
        Ok(ModuleTest::Glob(Glob::new(pattern)?.compile_matcher()))
    }

    pub fn custom(f: impl Fn(&Module) -> bool + Send + Sync + 'static) -> Self {
        ModuleTest::Custom(Arc::new(f))
    }

    pub fn matches(&self, module: &Module) -> bool {
        match self {
            ModuleTest::Always => true,
            ModuleTest::Regex(regex) => regex.is_match(&module.identifier),
            ModuleTest::Glob(glob) => {
                let path = module
                    .identifier
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default();
                glob.is_match(clean_path(&path.replace('\\', "/")))
            }
            ModuleTest::Type(module_type) => module.module_type == *module_type,
            ModuleTest::Custom(f) => f(module),
        }
    }
}

impl fmt::Debug for ModuleTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleTest::Always => write!(f, "Always"),
            ModuleTest::Regex(regex) => write!(f, "Regex({})", regex.as_str()),
            ModuleTest::Glob(glob) => write!(f, "Glob({})", glob.glob()),
            ModuleTest::Type(module_type) => write!(f, "Type({})", module_type.as_str()),
            ModuleTest::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// Name of the chunk a cache group produces
#[derive(Clone)]
pub enum ChunkName {
    Fixed(String),
    /// Called with the module and the cache group key; `None` leaves it unnamed
    Custom(Arc<dyn Fn(&Module, &str) -> Option<String> + Send + Sync>),
}

impl ChunkName {
    pub fn custom(f: impl Fn(&Module, &str) -> Option<String> + Send + Sync + 'static) -> Self {
        ChunkName::Custom(Arc::new(f))
    }

    pub fn for_module(&self, module: &Module, cache_group: &str) -> Option<String> {
        match self {
            ChunkName::Fixed(name) => Some(name.clone()),
            ChunkName::Custom(f) => f(module, cache_group),
        }
    }
}

impl fmt::Debug for ChunkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkName::Fixed(name) => f.debug_tuple("Fixed").field(name).finish(),
            ChunkName::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}

/// One setting of a cache group
#[derive(Debug, Clone)]
pub enum CacheGroupEffect {
    /// Restrict to matching modules; several tests must all match
    Test(ModuleTest),
    Chunks(ChunkFilter),
    MinSize(u64),
    MaxSize(u64),
    MinChunks(usize),
    MinRemainingSize(u64),
    MaxAsyncRequests(usize),
    MaxInitialRequests(usize),
    Priority(i32),
    /// Ignore the global size and request limits
    Enforce(bool),
    ReuseExistingChunk(bool),
    Name(ChunkName),
    IdHint(String),
    Filename(String),
}

#[derive(Debug, Clone)]
pub struct CacheGroup {
    pub key: String,
    pub effects: Vec<CacheGroupEffect>,
}

impl CacheGroup {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            effects: Vec::new(),
        }
    }

    pub fn effect(mut self, effect: CacheGroupEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn test(self, test: ModuleTest) -> Self {
        self.effect(CacheGroupEffect::Test(test))
    }

    pub fn chunks(self, filter: ChunkFilter) -> Self {
        self.effect(CacheGroupEffect::Chunks(filter))
    }

    pub fn min_size(self, size: u64) -> Self {
        self.effect(CacheGroupEffect::MinSize(size))
    }

    pub fn max_size(self, size: u64) -> Self {
        self.effect(CacheGroupEffect::MaxSize(size))
    }

    pub fn min_chunks(self, count: usize) -> Self {
        self.effect(CacheGroupEffect::MinChunks(count))
    }

    pub fn priority(self, priority: i32) -> Self {
        self.effect(CacheGroupEffect::Priority(priority))
    }

    pub fn enforce(self, enforce: bool) -> Self {
        self.effect(CacheGroupEffect::Enforce(enforce))
    }

    pub fn reuse_existing_chunk(self, reuse: bool) -> Self {
        self.effect(CacheGroupEffect::ReuseExistingChunk(reuse))
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.effect(CacheGroupEffect::Name(ChunkName::Fixed(name.into())))
    }

    pub fn id_hint(self, hint: impl Into<String>) -> Self {
        self.effect(CacheGroupEffect::IdHint(hint.into()))
    }

    /// Interpret the effects against the global defaults
    pub fn resolve(&self, index: usize, defaults: &SplitChunksOptions) -> ResolvedCacheGroup {
        let mut tests = Vec::new();
        let mut chunks = None;
        let mut min_size = None;
        let mut max_size = None;
        let mut min_chunks = None;
        let mut min_remaining_size = None;
        let mut max_async_requests = None;
        let mut max_initial_requests = None;
        let mut priority = 0;
        let mut enforce = false;
        let mut reuse_existing_chunk = false;
        let mut name = None;
        let mut id_hint = None;
        let mut filename = None;

        for effect in &self.effects {
            match effect {
                CacheGroupEffect::Test(test) => tests.push(test.clone()),
                CacheGroupEffect::Chunks(filter) => chunks = Some(*filter),
                CacheGroupEffect::MinSize(size) => min_size = Some(*size),
                CacheGroupEffect::MaxSize(size) => max_size = Some(*size),
                CacheGroupEffect::MinChunks(count) => min_chunks = Some(*count),
                CacheGroupEffect::MinRemainingSize(size) => min_remaining_size = Some(*size),
                CacheGroupEffect::MaxAsyncRequests(n) => max_async_requests = Some(*n),
                CacheGroupEffect::MaxInitialRequests(n) => max_initial_requests = Some(*n),
                CacheGroupEffect::Priority(p) => priority = *p,
                CacheGroupEffect::Enforce(e) => enforce = *e,
                CacheGroupEffect::ReuseExistingChunk(r) => reuse_existing_chunk = *r,
                CacheGroupEffect::Name(n) => name = Some(n.clone()),
                CacheGroupEffect::IdHint(hint) => id_hint = Some(hint.clone()),
                CacheGroupEffect::Filename(template) => filename = Some(template.clone()),
            }
        }

        // Enforced groups only keep the limits they set themselves
        let min_size = min_size.unwrap_or(if enforce { 0 } else { defaults.min_size });
        ResolvedCacheGroup {
            key: self.key.clone(),
            index,
            tests,
            chunks: chunks.unwrap_or(defaults.chunks),
            min_size,
            max_size: max_size.or(if enforce { None } else { defaults.max_size }),
            min_chunks: min_chunks
                .unwrap_or(if enforce { 1 } else { defaults.min_chunks })
                .max(1),
            min_remaining_size: min_remaining_size.unwrap_or(if enforce {
                0
            } else {
                defaults.min_remaining_size.unwrap_or(min_size)
            }),
            max_async_requests: max_async_requests.unwrap_or(if enforce {
                usize::MAX
            } else {
                defaults.max_async_requests
            }),
            max_initial_requests: max_initial_requests.unwrap_or(if enforce {
                usize::MAX
            } else {
                defaults.max_initial_requests
            }),
            priority,
            enforce,
            reuse_existing_chunk,
            name,
            id_hint: id_hint.unwrap_or_else(|| self.key.clone()),
            filename,
        }
    }
}

/// A cache group with every setting decided
#[derive(Debug, Clone)]
pub struct ResolvedCacheGroup {
    pub key: String,
    /// Registration order, lower wins on equal priority
    pub index: usize,
    pub tests: Vec<ModuleTest>,
    pub chunks: ChunkFilter,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub min_chunks: usize,
    pub min_remaining_size: u64,
    pub max_async_requests: usize,
    pub max_initial_requests: usize,
    pub priority: i32,
    pub enforce: bool,
    pub reuse_existing_chunk: bool,
    pub name: Option<ChunkName>,
    pub id_hint: String,
    pub filename: Option<String>,
}

impl ResolvedCacheGroup {
    pub fn matches(&self, module: &Module) -> bool {
        self.tests.iter().all(|test| test.matches(module))
    }
}

/// Global split chunks settings and the cache groups to apply
#[derive(Debug, Clone)]
pub struct SplitChunksOptions {
    pub chunks: ChunkFilter,
    pub min_size: u64,
    /// Defaults to `min_size` when unset
    pub min_remaining_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Max size for chunks no cache group created
    pub fallback_max_size: Option<u64>,
    pub min_chunks: usize,
    pub max_async_requests: usize,
    pub max_initial_requests: usize,
    pub enforce_size_threshold: u64,
    pub automatic_name_delimiter: String,
    /// Upper bound on repeated split passes
    pub max_passes: usize,
    pub cache_groups: Vec<CacheGroup>,
}

impl Default for SplitChunksOptions {
    fn default() -> Self {
        Self {
            chunks: ChunkFilter::All,
            min_size: 20_000,
            min_remaining_size: None,
            max_size: None,
            fallback_max_size: None,
            min_chunks: 1,
            max_async_requests: 30,
            max_initial_requests: 30,
            enforce_size_threshold: 50_000,
            automatic_name_delimiter: "~".to_string(),
            max_passes: 8,
            cache_groups: default_cache_groups(),
        }
    }
}

impl SplitChunksOptions {
    /// Resolve the configured cache groups followed by `extra`
    pub fn resolve_cache_groups(&self, extra: &[CacheGroup]) -> Vec<ResolvedCacheGroup> {
        self.cache_groups
            .iter()
            .chain(extra)
            .enumerate()
            .map(|(index, group)| group.resolve(index, self))
            .collect()
    }
}

static NODE_MODULES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\/]node_modules[\\/]").unwrap());

/// `default_vendors` for `node_modules` and `default` for shared code
pub fn default_cache_groups() -> Vec<CacheGroup> {
    vec![
        CacheGroup::new("default_vendors")
            .test(ModuleTest::Regex(NODE_MODULES.clone()))
            .priority(-10)
            .reuse_existing_chunk(true)
            .id_hint("vendors"),
        CacheGroup::new("default")
            .min_chunks(2)
            .priority(-20)
            .reuse_existing_chunk(true),
    ]
}
