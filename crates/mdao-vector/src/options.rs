//! Allocation options for distributed vectors.

use crate::error::{Result, VectorError};
use crate::global_default::default_n_columns;

/// Options controlling how a [`MultiVector`](crate::MultiVector) is allocated.
///
/// `n_columns` is the number of simultaneous right-hand sides carried by the
/// vector and is fixed for its lifetime. `alloc_complex` adds an imaginary
/// buffer per variable set for complex-step evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorOptions {
    /// Number of columns per variable-set buffer.
    pub n_columns: usize,
    /// Allocate imaginary shadow storage.
    pub alloc_complex: bool,
}

impl Default for VectorOptions {
    fn default() -> Self {
        Self {
            n_columns: default_n_columns(),
            alloc_complex: false,
        }
    }
}

impl VectorOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column count.
    #[must_use]
    pub fn with_columns(mut self, n_columns: usize) -> Self {
        self.n_columns = n_columns;
        self
    }

    /// Enable or disable imaginary shadow storage.
    #[must_use]
    pub fn with_complex(mut self, alloc_complex: bool) -> Self {
        self.alloc_complex = alloc_complex;
        self
    }

    /// Check that the options describe an allocatable vector.
    pub fn validate(&self) -> Result<()> {
        if self.n_columns == 0 {
            return Err(VectorError::InvalidOptions {
                message: "n_columns must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
