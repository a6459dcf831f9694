//! Global reductions over distributed vectors.

use crate::error::{Result, VectorError};
use crate::vector::MultiVector;

impl MultiVector {
    /// Euclidean norm over all sets and columns of the real storage.
    ///
    /// Local squares are summed, reduced once across the group and rooted.
    /// Imaginary storage does not contribute. On a single process the
    /// reduction is the identity, so the value only depends on how the data
    /// is partitioned through floating-point summation order.
    pub fn norm(&self) -> Result<f64> {
        let local: f64 = self
            .data
            .iter()
            .flat_map(|buf| buf.iter())
            .map(|&v| v * v)
            .sum();
        Ok(self.comm().sum_f64(local)?.sqrt())
    }

    /// Per-column Euclidean norms over all sets.
    pub fn column_norms(&self) -> Result<Vec<f64>> {
        let local = self.local_column_dots(self);
        let global = self.comm().all_reduce_sum_f64(&local)?;
        Ok(global.into_iter().map(f64::sqrt).collect())
    }

    /// Per-column inner product with `other` across the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors have different layouts or column counts.
    /// The reduction runs even then, so ranks where the vectors are compatible
    /// get [`VectorError::PeerFailure`] instead of blocking.
    pub fn dot(&self, other: &MultiVector) -> Result<Vec<f64>> {
        let checked = self.check_compatible(other);
        let mut local = match checked {
            Ok(()) => self.local_column_dots(other),
            Err(_) => vec![0.0; self.n_columns()],
        };
        local.push(if checked.is_err() { 1.0 } else { 0.0 });
        let reduced = self.comm().all_reduce_sum_f64(&local);
        checked?;
        let mut global = reduced?;
        let failed = global.pop().unwrap_or(0.0);
        if failed > 0.0 {
            return Err(VectorError::PeerFailure {
                op: "dot",
                failed: failed as usize,
            });
        }
        Ok(global)
    }

    fn local_column_dots(&self, other: &MultiVector) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_columns()];
        for (a, b) in self.data.iter().zip(&other.data) {
            for r in 0..a.dim(0) {
                for (c, acc) in sums.iter_mut().enumerate() {
                    *acc += a[[r, c]] * b[[r, c]];
                }
            }
        }
        sums
    }
}
