//! Error types for factor algebra and inference.

use thiserror::Error;

/// Errors that can occur in factor operations and inference queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PgmError {
    /// Index tuple or name/value list length does not match the axis count
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A category value lies outside its axis cardinality
    #[error("Value {value} out of range for variable '{variable}' with cardinality {cardinality}")]
    IndexOutOfRange {
        variable: String,
        value: usize,
        cardinality: usize,
    },

    /// Bulk assignment with the wrong number of entries
    #[error("Size mismatch: expected {expected} values, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// Variable not found in a factor or model
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// Variable named more than once where names must be distinct
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),

    /// Axis declared with a zero cardinality
    #[error("Invalid cardinality {cardinality} for variable '{variable}'")]
    InvalidCardinality { variable: String, cardinality: usize },

    /// Attempted to draw from a table whose total mass is zero
    #[error("Degenerate distribution: table has no positive mass")]
    DegenerateDistribution,

    /// The same variable has different cardinalities in two factors
    #[error("Cardinality conflict for '{variable}': {left} vs {right}")]
    CardinalityConflict {
        variable: String,
        left: usize,
        right: usize,
    },

    /// Factor collection is not a valid directed factorization
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Malformed evidence or elimination order
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Variables neither observed, eliminated nor queried
    #[error("Incomplete elimination, variables left over: {0:?}")]
    IncompleteElimination(Vec<String>),

    /// No variable is left to express the query over
    #[error("Query has no remaining variables")]
    EmptyQuery,
}

impl From<scirs2_core::ndarray::ShapeError> for PgmError {
    fn from(err: scirs2_core::ndarray::ShapeError) -> Self {
        PgmError::InvalidModel(format!("Shape error: {}", err))
    }
}

/// Result type for PGM operations.
pub type Result<T> = std::result::Result<T, PgmError>;
