//! Error types for collective communication

use thiserror::Error;

/// Result type for communication operations
pub type Result<T> = std::result::Result<T, CommError>;

/// Errors raised by collective operations and scatter construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    /// Ranks disagreed on the shape or kind of a collective call
    #[error("Collective mismatch in {op}: {detail}")]
    Mismatch {
        /// Name of the collective operation
        op: &'static str,
        /// Description of the disagreement
        detail: String,
    },

    /// Source and destination index sets differ in length on some rank
    #[error("Index set length mismatch on rank {rank}: source has {src}, destination has {dst}")]
    LengthMismatch {
        /// Rank that supplied the inconsistent pair
        rank: usize,
        /// Length of the source index set
        src: usize,
        /// Length of the destination index set
        dst: usize,
    },

    /// An index points outside the global extent of its vector
    #[error("Index {index} supplied by rank {rank} is out of range (global length {len})")]
    IndexOutOfRange {
        /// Rank that supplied the index
        rank: usize,
        /// The offending index
        index: usize,
        /// Global length of the indexed vector
        len: usize,
    },

    /// A column buffer does not match the extent the scatter was built for
    #[error("Column length mismatch on rank {rank}: expected {expected}, got {got}")]
    ColumnLength {
        /// Rank owning the column
        rank: usize,
        /// Length the scatter was built for
        expected: usize,
        /// Length that was supplied
        got: usize,
    },
}
