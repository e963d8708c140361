//! Error types for join compilation and resolution.
//!
//! Every failure here is a deterministic rejection of the query or its
//! configuration. Nothing is retried: the same inputs always fail the same way.

use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Broad category of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed join declaration text.
    Parse,
    /// Duplicate/self edges or declarations not owned by their table.
    Graph,
    /// Mismatched origins, ambiguous table reuse, cycles.
    Path,
    /// Missing lookup tables, dimensions, row id or aliases.
    Schema,
    /// Failure reported by the query compiler collaborator.
    Compiler,
}

/// Errors raised while compiling joins or resolving array dimensions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Invalid join SQL: {0}")]
    InvalidJoinSql(String),

    #[error("Table \"{table}\" not found in provided join SQL: {sql}")]
    JoinTableNotFound { table: String, sql: String },

    #[error("An invalid path was detected.")]
    InvalidPath,

    #[error("Invalid path, multiple data sources are present without a join path.")]
    EmptyJoinPath,

    #[error("Invalid path, starting node is not the same for all paths.")]
    MismatchedOrigin,

    #[error("Path ambiguity, node {0} visited from different sources")]
    AmbiguousPath(String),

    #[error("A loop was detected in the joins. {0}")]
    LoopDetected(String),

    #[error("No join condition from '{left}' to '{right}' on '{on}'")]
    MissingJoinEdge {
        left: String,
        right: String,
        on: String,
    },

    #[error("No SQL registered for table '{0}'")]
    UnknownTable(String),

    #[error("Not found: {0}")]
    UnknownMember(String),

    #[error("Column projection '{0}' not found in base table schema dimensions")]
    UnknownProjection(String),

    #[error("Source table schema not found for {0}")]
    MissingSourceSchema(String),

    #[error("Dimension not found: {0}")]
    MissingDimension(String),

    #[error("Row id dimension not found")]
    MissingRowId,

    #[error("Source field alias not found for {0}")]
    MissingAlias(String),

    #[error("SQL override for field '{field}' must reference the field as '{expected}' in the SQL. Current SQL: {sql}")]
    InvalidOverride {
        field: String,
        expected: String,
        sql: String,
    },

    #[error("Query compiler failed: {0}")]
    Compiler(String),
}

impl CompileError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidJoinSql(_) => ErrorCategory::Parse,
            Self::JoinTableNotFound { .. } | Self::InvalidPath => ErrorCategory::Graph,
            Self::EmptyJoinPath
            | Self::MismatchedOrigin
            | Self::AmbiguousPath(_)
            | Self::LoopDetected(_)
            | Self::MissingJoinEdge { .. }
            | Self::UnknownTable(_) => ErrorCategory::Path,
            Self::UnknownMember(_)
            | Self::UnknownProjection(_)
            | Self::MissingSourceSchema(_)
            | Self::MissingDimension(_)
            | Self::MissingRowId
            | Self::MissingAlias(_)
            | Self::InvalidOverride { .. } => ErrorCategory::Schema,
            Self::Compiler(_) => ErrorCategory::Compiler,
        }
    }

    /// Wrap a collaborator failure.
    pub fn compiler(message: impl Into<String>) -> Self {
        Self::Compiler(message.into())
    }
}
