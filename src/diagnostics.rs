//! Non-fatal diagnostics accumulated while building and optimizing

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// What went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Two chunks asked for the same name; the later one kept it
    ChunkNameConflict { name: String },
    /// An async block asked for a chunk name owned by an entrypoint
    AsyncChunkNamedLikeEntrypoint { name: String, module: String },
    /// A cache group name resolves to an entrypoint chunk
    CacheGroupConflictsWithEntrypoint { cache_group: String, name: String },
    /// A single module is larger than the max size of its chunk
    ModuleExceedsMaxSize { module: String, size: u64, max_size: u64 },
    /// A cache group matched modules but never produced a chunk
    UnsatisfiedCacheGroup { cache_group: String, modules: usize },
    /// Entries listed in `depend_on` run in different runtimes
    MixedDependOnRuntimes { entry: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }

    pub fn info(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Info,
            kind,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::ChunkNameConflict { name } => {
                write!(f, "chunk name '{}' is used by more than one chunk, the last one wins", name)
            }
            DiagnosticKind::AsyncChunkNamedLikeEntrypoint { name, module } => write!(
                f,
                "async import in '{}' requests chunk name '{}' which belongs to an entrypoint",
                module, name
            ),
            DiagnosticKind::CacheGroupConflictsWithEntrypoint { cache_group, name } => write!(
                f,
                "cache group '{}' names its chunk '{}' which is an entrypoint chunk",
                cache_group, name
            ),
            DiagnosticKind::ModuleExceedsMaxSize {
                module,
                size,
                max_size,
            } => write!(
                f,
                "module '{}' ({} bytes) is larger than max size {}",
                module, size, max_size
            ),
            DiagnosticKind::UnsatisfiedCacheGroup {
                cache_group,
                modules,
            } => write!(
                f,
                "cache group '{}' matched {} module(s) but produced no chunk",
                cache_group, modules
            ),
            DiagnosticKind::MixedDependOnRuntimes { entry } => write!(
                f,
                "entry '{}' depends on entries with different runtimes",
                entry
            ),
        }
    }
}

/// Accumulated diagnostics, logged as they are pushed
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!("{}", diagnostic),
            Severity::Info => tracing::debug!("{}", diagnostic),
        }
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_warning())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
