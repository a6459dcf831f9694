//! Element-wise vector algebra used by linear and nonlinear solvers.
//!
//! All operations act on the real storage of every set and column; none of
//! them is collective.

use crate::error::Result;
use crate::vector::MultiVector;

impl MultiVector {
    /// Set every real entry to `value`.
    pub fn set_const(&mut self, value: f64) {
        for buf in &mut self.data {
            buf.iter_mut().for_each(|v| *v = value);
        }
    }

    /// Multiply every real entry by `alpha`.
    pub fn scale(&mut self, alpha: f64) {
        for buf in &mut self.data {
            buf.iter_mut().for_each(|v| *v *= alpha);
        }
    }

    /// Copy the real storage of `other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors have different layouts or column counts.
    pub fn set_vec(&mut self, other: &MultiVector) -> Result<()> {
        self.check_compatible(other)?;
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                *d = s;
            }
        }
        Ok(())
    }

    /// `self += alpha * other` on the real storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors have different layouts or column counts.
    pub fn add_scaled(&mut self, alpha: f64, other: &MultiVector) -> Result<()> {
        self.check_compatible(other)?;
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                *d += alpha * s;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mdao_comm::SerialComm;

    use crate::{MultiVector, VarSetId, VarSetLayout, VectorError, VectorInfo, VectorOptions};

    fn vector(len: usize, n_columns: usize) -> (MultiVector, VarSetId) {
        let layout = VarSetLayout::from_sets([("x", len)]).unwrap();
        let id = layout.id("x").unwrap();
        let vec = MultiVector::allocate(
            layout,
            VectorOptions::new().with_columns(n_columns).with_complex(true),
            Arc::new(SerialComm),
            Arc::new(VectorInfo::new()),
        )
        .unwrap();
        (vec, id)
    }

    #[test]
    fn test_set_const_and_scale() {
        let (mut v, x) = vector(2, 2);
        v.set_const(1.5);
        v.scale(-2.0);
        assert_eq!(v.column(x, 0).unwrap(), vec![-3.0, -3.0]);
        assert_eq!(v.column(x, 1).unwrap(), vec![-3.0, -3.0]);
        // imaginary storage is untouched
        assert_eq!(v.imag_column(x, 0).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_set_vec_and_add_scaled() {
        let (mut a, x) = vector(3, 1);
        let (mut b, _) = vector(3, 1);
        b.set_column(x, 0, &[1.0, 2.0, 3.0]).unwrap();

        a.set_vec(&b).unwrap();
        assert_eq!(a.column(x, 0).unwrap(), vec![1.0, 2.0, 3.0]);

        a.add_scaled(0.5, &b).unwrap();
        assert_eq!(a.column(x, 0).unwrap(), vec![1.5, 3.0, 4.5]);
    }

    #[test]
    fn test_incompatible_vectors_rejected() {
        let (mut a, _) = vector(3, 1);
        let (b, _) = vector(2, 1);
        let (c, _) = vector(3, 2);
        assert_eq!(a.set_vec(&b), Err(VectorError::LayoutMismatch));
        assert_eq!(a.add_scaled(1.0, &c), Err(VectorError::ColumnMismatch { left: 1, right: 2 }));
    }
}
