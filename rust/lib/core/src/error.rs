use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these —
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const MALFORMED_INPUT: &str = "MALFORMED_INPUT";
    pub const UNKNOWN_COLUMN: &str = "UNKNOWN_COLUMN";
    pub const UNKNOWN_RELATION: &str = "UNKNOWN_RELATION";
    pub const INVALID_SCHEMA: &str = "INVALID_SCHEMA";
    pub const DEPTH_EXCEEDED: &str = "DEPTH_EXCEEDED";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── GraphError ──────────────────────────────────────────────────────

/// Unified error type for catalog, serialize and save operations.
///
/// Unknown record types and empty nested structures are not errors:
/// those paths resolve to "nothing saved" (`Ok(None)`).
#[derive(Error, Debug)]
pub enum GraphError {
    /// Record id does not exist in the object store.
    #[error("{0}")]
    NotFound(String),

    /// Save payload does not have the `{"data": {...}}` shape.
    #[error("{0}")]
    Malformed(String),

    /// Attribute is not a declared column of the record's type.
    #[error("{0}")]
    UnknownColumn(String),

    /// Relation name is not declared on the record's type.
    #[error("{0}")]
    UnknownRelation(String),

    /// Type definitions are inconsistent (duplicate, unknown parent, cycle).
    #[error("{0}")]
    InvalidSchema(String),

    /// Object graph is nested deeper than the configured limit.
    #[error("graph nesting exceeds max depth {0}")]
    DepthExceeded(usize),

    /// Storage backend failure.
    #[error("{0}")]
    Storage(String),

    /// Unexpected internal error.
    #[error("{0}")]
    Internal(String),
}

impl GraphError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            GraphError::NotFound(_) => error_code::NOT_FOUND,
            GraphError::Malformed(_) => error_code::MALFORMED_INPUT,
            GraphError::UnknownColumn(_) => error_code::UNKNOWN_COLUMN,
            GraphError::UnknownRelation(_) => error_code::UNKNOWN_RELATION,
            GraphError::InvalidSchema(_) => error_code::INVALID_SCHEMA,
            GraphError::DepthExceeded(_) => error_code::DEPTH_EXCEEDED,
            GraphError::Storage(_) => error_code::STORAGE_ERROR,
            GraphError::Internal(_) => error_code::INTERNAL,
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Internal(format!("json: {}", e))
    }
}
