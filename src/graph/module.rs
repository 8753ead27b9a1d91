//! Module, dependency and async block types

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Dense index of a module in the [`ModuleGraph`](super::ModuleGraph) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(u32);

impl ModuleId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Dense index of an async dependencies block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Types of modules the bundler can handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    JavaScript,
    TypeScript,
    Jsx,
    Tsx,
    Css,
    Json,
    Asset,
    Unknown,
}

impl ModuleType {
    /// Determine module type from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => ModuleType::JavaScript,
            "ts" | "mts" | "cts" => ModuleType::TypeScript,
            "jsx" => ModuleType::Jsx,
            "tsx" => ModuleType::Tsx,
            "css" | "scss" | "sass" | "less" => ModuleType::Css,
            "json" => ModuleType::Json,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "woff" | "woff2" => ModuleType::Asset,
            _ => ModuleType::Unknown,
        }
    }

    /// Determine module type from a module identifier
    pub fn detect(identifier: &str) -> Self {
        let path = identifier.split(['?', '#']).next().unwrap_or(identifier);
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(ModuleType::from_extension)
            .unwrap_or(ModuleType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::JavaScript => "javascript",
            ModuleType::TypeScript => "typescript",
            ModuleType::Jsx => "jsx",
            ModuleType::Tsx => "tsx",
            ModuleType::Css => "css",
            ModuleType::Json => "json",
            ModuleType::Asset => "asset",
            ModuleType::Unknown => "unknown",
        }
    }
}

/// A module in the dependency graph
#[derive(Debug, Clone)]
pub struct Module {
    /// Stable identifier (usually the resolved request)
    pub identifier: String,

    /// Human readable name, used for named ids
    pub name: Option<String>,

    /// Size in bytes
    pub size: u64,

    /// Opaque content hash supplied by the module graph producer
    pub hash: String,

    /// Module type
    pub module_type: ModuleType,

    pub(crate) dependencies: Vec<Dependency>,

    pub(crate) blocks: Vec<BlockId>,
}

impl Module {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let module_type = ModuleType::detect(&identifier);
        Self {
            identifier,
            name: None,
            size: 0,
            hash: String::new(),
            module_type,
            dependencies: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_type(mut self, module_type: ModuleType) -> Self {
        self.module_type = module_type;
        self
    }

    /// Name shown to humans: explicit name or the identifier
    pub fn readable_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.identifier)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }
}

/// How a dependency edge behaves during chunk assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Included in the importing chunk group
    Sync,
    /// Crosses an async boundary, always attached to a block
    Async,
    /// Only resolves an existing module reference, never includes it
    Weak,
}

/// An edge to a target module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub target: ModuleId,
    pub kind: DependencyKind,
    pub block: Option<BlockId>,
    /// Conditionally disabled edges are kept for reference but never followed
    pub active: bool,
}

impl Dependency {
    pub fn sync(target: ModuleId) -> Self {
        Self {
            target,
            kind: DependencyKind::Sync,
            block: None,
            active: true,
        }
    }

    pub fn weak(target: ModuleId) -> Self {
        Self {
            target,
            kind: DependencyKind::Weak,
            block: None,
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether following this edge includes the target
    pub fn is_followed(&self) -> bool {
        self.active && self.kind != DependencyKind::Weak
    }
}

/// A group of dependencies behind an async boundary, e.g. one `import()` call
#[derive(Debug, Clone)]
pub struct AsyncBlock {
    pub owner: ModuleId,
    /// Chunk name hint; blocks with the same hint share a chunk group
    pub chunk_name: Option<String>,
}

/// A user-declared entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub modules: Vec<ModuleId>,
    /// Explicit runtime name, defaults to the entry name
    pub runtime: Option<String>,
    /// Entries whose modules this entry may assume are loaded
    pub depend_on: Vec<String>,
}

impl Entry {
    pub fn new(name: impl Into<String>, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            modules: vec![module],
            runtime: None,
            depend_on: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn depend_on(mut self, entry: impl Into<String>) -> Self {
        self.depend_on.push(entry.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_type_detection() {
        assert_eq!(ModuleType::from_extension("js"), ModuleType::JavaScript);
        assert_eq!(ModuleType::from_extension("ts"), ModuleType::TypeScript);
        assert_eq!(ModuleType::from_extension("jsx"), ModuleType::Jsx);
        assert_eq!(ModuleType::from_extension("tsx"), ModuleType::Tsx);
        assert_eq!(ModuleType::from_extension("css"), ModuleType::Css);
        assert_eq!(ModuleType::from_extension("json"), ModuleType::Json);
        assert_eq!(ModuleType::from_extension("xyz"), ModuleType::Unknown);
    }

    #[test]
    fn test_detect_ignores_query() {
        assert_eq!(ModuleType::detect("./src/app.css?module"), ModuleType::Css);
        assert_eq!(ModuleType::detect("./src/main.ts"), ModuleType::TypeScript);
        assert_eq!(ModuleType::detect("virtual:runtime"), ModuleType::Unknown);
    }

    #[test]
    fn test_dependency_following() {
        let target = ModuleId::from_index(1);
        assert!(Dependency::sync(target).is_followed());
        assert!(!Dependency::weak(target).is_followed());
        assert!(!Dependency::sync(target).inactive().is_followed());
    }
}
