//! Error types for distributed vector and transfer operations

use mdao_comm::CommError;
use thiserror::Error;

use crate::layout::VarSetId;
use crate::transfer::TransferKey;

/// Result type for vector operations
pub type Result<T> = std::result::Result<T, VectorError>;

/// Errors that can occur while allocating vectors or building and applying
/// transfers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    /// Invalid allocation options
    #[error("Invalid vector options: {message}")]
    InvalidOptions {
        /// Description of the problem
        message: String,
    },

    /// A variable set name was registered twice
    #[error("Duplicate variable set: {name}")]
    DuplicateVarSet {
        /// The repeated name
        name: String,
    },

    /// A variable set id does not belong to the vector's layout
    #[error("Unknown variable set id {id:?} (layout has {len} sets)")]
    UnknownVarSet {
        /// The offending id
        id: VarSetId,
        /// Number of sets in the layout
        len: usize,
    },

    /// Column index past the vector's column count
    #[error("Column {column} out of range (vector has {n_columns} columns)")]
    ColumnOutOfRange {
        /// Requested column
        column: usize,
        /// Column count of the vector
        n_columns: usize,
    },

    /// Row index past the set's local length
    #[error("Row {row} out of range (set has {len} local rows)")]
    RowOutOfRange {
        /// Requested row
        row: usize,
        /// Local row count of the set
        len: usize,
    },

    /// Supplied data does not match the buffer shape
    #[error("Shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch {
        /// Number of values the buffer holds
        expected: usize,
        /// Number of values supplied
        got: usize,
    },

    /// Two vectors combined in one operation have different layouts
    #[error("Vector layouts differ")]
    LayoutMismatch,

    /// Two vectors combined in one operation carry different column counts
    #[error("Column count mismatch: {left} vs {right}")]
    ColumnMismatch {
        /// Columns of the first vector
        left: usize,
        /// Columns of the second vector
        right: usize,
    },

    /// A transfer key appears in only one of the two index maps
    #[error("Transfer key {key:?} is missing from the {side} index map")]
    MissingKey {
        /// The unmatched key
        key: TransferKey,
        /// Which map lacks the key ("input" or "output")
        side: &'static str,
    },

    /// The two vectors of a transfer live on groups of different size
    #[error("Process group mismatch: input vector on {input} ranks, output vector on {output}")]
    GroupMismatch {
        /// Group size of the input vector
        input: usize,
        /// Group size of the output vector
        output: usize,
    },

    /// A collective setup step failed on other ranks of the group
    #[error("{op} failed on {failed} other rank(s)")]
    PeerFailure {
        /// Operation that failed
        op: &'static str,
        /// Number of ranks that reported a local error
        failed: usize,
    },

    /// Imaginary storage was requested but not allocated
    #[error("Vector has no complex-step storage")]
    MissingComplexStorage,

    /// Error from a collective operation
    #[error("Communication error: {0}")]
    Comm(#[from] CommError),
}
