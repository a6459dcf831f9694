//! Process-wide allocation defaults with atomic access.
//!
//! [`VectorOptions::default`](crate::VectorOptions) reads the column count
//! from here, so an owning system can switch every vector it allocates to
//! batched right-hand sides without threading the value through each call.

use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Error for invalid column counts.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Invalid column count: {0}. A vector must carry at least one column.")]
pub struct InvalidColumnCountError(pub usize);

/// A global default `usize` value with atomic access.
///
/// # Example
///
/// ```
/// use mdao_vector::GlobalDefault;
///
/// static MY_DEFAULT: GlobalDefault = GlobalDefault::new(4);
///
/// assert_eq!(MY_DEFAULT.get(), 4);
/// MY_DEFAULT.set(2).unwrap();
/// assert_eq!(MY_DEFAULT.get(), 2);
/// ```
#[derive(Debug)]
pub struct GlobalDefault {
    value: AtomicUsize,
}

impl GlobalDefault {
    /// Create a new global default with the given initial value.
    #[must_use]
    pub const fn new(initial: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial),
        }
    }

    /// Get the current default value.
    #[must_use]
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }

    /// Set a new default value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidColumnCountError` if the value is zero.
    pub fn set(&self, value: usize) -> Result<(), InvalidColumnCountError> {
        if value == 0 {
            return Err(InvalidColumnCountError(value));
        }
        self.value.store(value, Ordering::Relaxed);
        Ok(())
    }
}

static DEFAULT_N_COLUMNS: GlobalDefault = GlobalDefault::new(1);

/// Column count used by [`VectorOptions::default`](crate::VectorOptions).
pub fn default_n_columns() -> usize {
    DEFAULT_N_COLUMNS.get()
}

/// Change the column count used by [`VectorOptions::default`](crate::VectorOptions).
pub fn set_default_n_columns(n_columns: usize) -> Result<(), InvalidColumnCountError> {
    DEFAULT_N_COLUMNS.set(n_columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_default() {
        static TEST_DEFAULT: GlobalDefault = GlobalDefault::new(1);

        assert_eq!(TEST_DEFAULT.get(), 1);
        TEST_DEFAULT.set(3).unwrap();
        assert_eq!(TEST_DEFAULT.get(), 3);
    }

    #[test]
    fn test_zero_rejected() {
        static TEST_DEFAULT: GlobalDefault = GlobalDefault::new(2);

        assert_eq!(TEST_DEFAULT.set(0), Err(InvalidColumnCountError(0)));
        assert_eq!(TEST_DEFAULT.get(), 2);
    }

    #[test]
    fn test_error_display() {
        let msg = format!("{}", InvalidColumnCountError(0));
        assert!(msg.contains("column count"));
    }
}
