//! Fatal error types
//!
//! Anything in here aborts the build. Advisory problems are reported as
//! [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use thiserror::Error;

/// Malformed module graph input
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("module '{0}' is defined more than once")]
    DuplicateModule(String),

    #[error("unknown module '{identifier}' referenced by {referenced_by}")]
    UnknownModule {
        identifier: String,
        referenced_by: String,
    },

    #[error("module index {0} is out of bounds")]
    ModuleOutOfBounds(usize),

    #[error("block index {0} is out of bounds")]
    BlockOutOfBounds(usize),

    #[error("dependency belongs to block {block} which is owned by another module")]
    ForeignBlock { block: usize },

    #[error("entry '{0}' is defined more than once")]
    DuplicateEntry(String),

    #[error("entry '{0}' has no modules")]
    EmptyEntry(String),

    #[error("failed to parse module graph: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural failure while building the chunk graph
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("entry '{entry}' names module index {module} which is not in the module graph")]
    UnknownEntryModule { entry: String, module: usize },

    #[error("entry '{entry}' depends on unknown entry '{depend_on}'")]
    UnknownDependOn { entry: String, depend_on: String },

    #[error("entry '{0}' is part of a dependOn cycle")]
    DependOnCycle(String),

    #[error("entry '{0}' sets both 'runtime' and 'depend_on'")]
    ConflictingEntryOptions(String),

    #[error("chunk graph traversal did not terminate after {processed} steps (limit {limit})")]
    TraversalLimitExceeded { processed: usize, limit: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
