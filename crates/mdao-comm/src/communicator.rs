//! Communicator capability and the single-process backend.
//!
//! A [`Communicator`] is the fixed group of cooperating processes a
//! distributed vector lives on. Every method is a collective: all ranks of
//! the group must call it the same number of times, in the same order.
//!
//! Backends only have to provide the two all-gather primitives. The
//! reductions are derived from them and always sum contributions in rank
//! order, so every rank obtains a bit-identical result.

use std::fmt;
use std::ops::AddAssign;

use crate::error::{CommError, Result};

/// Group of processes participating in collective operations.
pub trait Communicator: Send + Sync + fmt::Debug {
    /// Rank of the calling process within the group.
    fn rank(&self) -> usize;

    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Gather every rank's `f64` contribution, indexed by rank.
    fn all_gather_f64(&self, local: &[f64]) -> Result<Vec<Vec<f64>>>;

    /// Gather every rank's `usize` contribution, indexed by rank.
    fn all_gather_usize(&self, local: &[usize]) -> Result<Vec<Vec<usize>>>;

    /// Element-wise sum of `local` across the group.
    ///
    /// Every rank must pass a slice of the same length.
    fn all_reduce_sum_f64(&self, local: &[f64]) -> Result<Vec<f64>> {
        let gathered = self.all_gather_f64(local)?;
        sum_by_rank("all_reduce_sum_f64", &gathered, local.len())
    }

    /// Element-wise sum of `local` across the group.
    ///
    /// Every rank must pass a slice of the same length.
    fn all_reduce_sum_usize(&self, local: &[usize]) -> Result<Vec<usize>> {
        let gathered = self.all_gather_usize(local)?;
        sum_by_rank("all_reduce_sum_usize", &gathered, local.len())
    }

    /// Sum a single scalar across the group.
    fn sum_f64(&self, local: f64) -> Result<f64> {
        Ok(self.all_reduce_sum_f64(&[local])?[0])
    }
}

/// Sum per-rank contributions element-wise, visiting ranks in order.
pub(crate) fn sum_by_rank<T>(op: &'static str, gathered: &[Vec<T>], len: usize) -> Result<Vec<T>>
where
    T: Copy + Default + AddAssign,
{
    let mut total = vec![T::default(); len];
    for (rank, contribution) in gathered.iter().enumerate() {
        if contribution.len() != len {
            return Err(CommError::Mismatch {
                op,
                detail: format!(
                    "rank {} contributed {} values, expected {}",
                    rank,
                    contribution.len(),
                    len
                ),
            });
        }
        for (acc, &v) in total.iter_mut().zip(contribution) {
            *acc += v;
        }
    }
    Ok(total)
}

/// Group of exactly one process.
///
/// Gathers return the local contribution and reductions are the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather_f64(&self, local: &[f64]) -> Result<Vec<Vec<f64>>> {
        Ok(vec![local.to_vec()])
    }

    fn all_gather_usize(&self, local: &[usize]) -> Result<Vec<Vec<usize>>> {
        Ok(vec![local.to_vec()])
    }
}
