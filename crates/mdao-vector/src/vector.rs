//! Distributed multi-column vector.
//!
//! A [`MultiVector`] owns, for every variable set of its layout, a dense
//! `(local_len, n_columns)` buffer of real values and, when allocated with
//! complex support, an imaginary buffer of the same shape. Each set's rows
//! are a contiguous slice of that set's global numbering across the process
//! group; the offsets are fixed at allocation.

use std::sync::Arc;

use mdao_comm::{CommError, Communicator};
use mdarray::DTensor;
use num_complex::Complex64;
use tracing::debug;

use crate::error::{Result, VectorError};
use crate::info::VectorInfo;
use crate::layout::{VarSetId, VarSetLayout};
use crate::options::VectorOptions;

/// Dense per-set buffer: rows are elements, columns are right-hand sides.
pub type SetBuffer = DTensor<f64, 2>;

/// Distributed vector with one multi-column buffer per variable set.
#[derive(Debug, Clone)]
pub struct MultiVector {
    layout: VarSetLayout,
    n_columns: usize,
    comm: Arc<dyn Communicator>,
    info: Arc<VectorInfo>,
    offsets: Vec<usize>,
    global_lens: Vec<usize>,
    pub(crate) data: Vec<SetBuffer>,
    pub(crate) imag: Option<Vec<SetBuffer>>,
}

impl MultiVector {
    /// Allocate zero-initialised storage for every set of `layout`.
    ///
    /// This is a collective: one all-gather of the local set lengths fixes
    /// each set's global extent and the calling rank's offset within it.
    ///
    /// # Errors
    ///
    /// - [`VectorError::InvalidOptions`] if `options` fail validation
    /// - [`VectorError::Comm`] if the ranks' layouts have different set counts
    pub fn allocate(
        layout: VarSetLayout,
        options: VectorOptions,
        comm: Arc<dyn Communicator>,
        info: Arc<VectorInfo>,
    ) -> Result<Self> {
        options.validate()?;

        let gathered = comm.all_gather_usize(layout.local_lens())?;
        let rank = comm.rank();
        let n_sets = layout.len();
        let mut offsets = vec![0; n_sets];
        let mut global_lens = vec![0; n_sets];
        for (r, lens) in gathered.iter().enumerate() {
            if lens.len() != n_sets {
                return Err(CommError::Mismatch {
                    op: "MultiVector::allocate",
                    detail: format!("rank {} has {} variable sets, expected {}", r, lens.len(), n_sets),
                }
                .into());
            }
            for (s, &len) in lens.iter().enumerate() {
                if r < rank {
                    offsets[s] += len;
                }
                global_lens[s] += len;
            }
        }

        let zeros = |layout: &VarSetLayout| -> Vec<SetBuffer> {
            layout
                .local_lens()
                .iter()
                .map(|&len| SetBuffer::from_elem([len, options.n_columns], 0.0))
                .collect()
        };
        let data = zeros(&layout);
        let imag = options.alloc_complex.then(|| zeros(&layout));

        debug!(
            rank,
            sets = n_sets,
            local_len = layout.total_local_len(),
            n_columns = options.n_columns,
            complex = options.alloc_complex,
            "allocated multi-vector"
        );

        Ok(Self {
            layout,
            n_columns: options.n_columns,
            comm,
            info,
            offsets,
            global_lens,
            data,
            imag,
        })
    }

    /// Variable-set layout of the calling rank
    pub fn layout(&self) -> &VarSetLayout {
        &self.layout
    }

    /// Number of columns (simultaneous right-hand sides)
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Process group the vector is distributed over
    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    /// Shared evaluation context
    pub fn info(&self) -> &Arc<VectorInfo> {
        &self.info
    }

    /// Whether imaginary storage was allocated
    pub fn has_complex(&self) -> bool {
        self.imag.is_some()
    }

    /// Whether the shared context is in complex-step mode
    pub fn under_complex_step(&self) -> bool {
        self.info.under_complex_step()
    }

    /// Local row count of a set
    pub fn local_len(&self, id: VarSetId) -> Result<usize> {
        self.layout.check(id)?;
        Ok(self.data[id.index()].dim(0))
    }

    /// Position of this rank's first row within the set's global numbering
    pub fn global_offset(&self, id: VarSetId) -> Result<usize> {
        self.layout.check(id)?;
        Ok(self.offsets[id.index()])
    }

    /// Row count of a set summed over the whole group
    pub fn global_len(&self, id: VarSetId) -> Result<usize> {
        self.layout.check(id)?;
        Ok(self.global_lens[id.index()])
    }

    /// Real buffer of a set
    pub fn set_data(&self, id: VarSetId) -> Result<&SetBuffer> {
        self.layout.check(id)?;
        Ok(&self.data[id.index()])
    }

    /// Mutable real buffer of a set
    pub fn set_data_mut(&mut self, id: VarSetId) -> Result<&mut SetBuffer> {
        self.layout.check(id)?;
        Ok(&mut self.data[id.index()])
    }

    /// Imaginary buffer of a set
    pub fn imag_data(&self, id: VarSetId) -> Result<&SetBuffer> {
        self.layout.check(id)?;
        let imag = self.imag.as_ref().ok_or(VectorError::MissingComplexStorage)?;
        Ok(&imag[id.index()])
    }

    /// Mutable imaginary buffer of a set
    pub fn imag_data_mut(&mut self, id: VarSetId) -> Result<&mut SetBuffer> {
        self.layout.check(id)?;
        let imag = self.imag.as_mut().ok_or(VectorError::MissingComplexStorage)?;
        Ok(&mut imag[id.index()])
    }

    /// Overwrite a whole set from row-major values (`local_len * n_columns`).
    pub fn assign_set(&mut self, id: VarSetId, values: &[f64]) -> Result<()> {
        let n_columns = self.n_columns;
        let buf = self.set_data_mut(id)?;
        let expected = buf.dim(0) * n_columns;
        if values.len() != expected {
            return Err(VectorError::ShapeMismatch {
                expected,
                got: values.len(),
            });
        }
        for (r, row) in values.chunks(n_columns).enumerate() {
            for (c, &v) in row.iter().enumerate() {
                buf[[r, c]] = v;
            }
        }
        Ok(())
    }

    /// Read one element of the real buffer.
    pub fn get(&self, id: VarSetId, row: usize, column: usize) -> Result<f64> {
        let buf = self.set_data(id)?;
        check_element(buf, row, column)?;
        Ok(buf[[row, column]])
    }

    /// Write one element of the real buffer.
    pub fn set(&mut self, id: VarSetId, row: usize, column: usize, value: f64) -> Result<()> {
        let buf = self.set_data_mut(id)?;
        check_element(buf, row, column)?;
        buf[[row, column]] = value;
        Ok(())
    }

    /// Copy of one column of a set's real buffer.
    pub fn column(&self, id: VarSetId, column: usize) -> Result<Vec<f64>> {
        let buf = self.set_data(id)?;
        check_column(buf, column)?;
        Ok(read_column(buf, column))
    }

    /// Overwrite one column of a set's real buffer.
    pub fn set_column(&mut self, id: VarSetId, column: usize, values: &[f64]) -> Result<()> {
        let buf = self.set_data_mut(id)?;
        check_column(buf, column)?;
        check_rows(buf, values.len())?;
        write_column(buf, column, values);
        Ok(())
    }

    /// Copy of one column of a set's imaginary buffer.
    pub fn imag_column(&self, id: VarSetId, column: usize) -> Result<Vec<f64>> {
        let buf = self.imag_data(id)?;
        check_column(buf, column)?;
        Ok(read_column(buf, column))
    }

    /// Overwrite one column of a set's imaginary buffer.
    pub fn set_imag_column(&mut self, id: VarSetId, column: usize, values: &[f64]) -> Result<()> {
        let buf = self.imag_data_mut(id)?;
        check_column(buf, column)?;
        check_rows(buf, values.len())?;
        write_column(buf, column, values);
        Ok(())
    }

    /// One column of a set as complex numbers, real part from the real
    /// buffer and imaginary part from the shadow buffer.
    pub fn complex_column(&self, id: VarSetId, column: usize) -> Result<Vec<Complex64>> {
        let re = self.column(id, column)?;
        let im = self.imag_column(id, column)?;
        Ok(re.into_iter().zip(im).map(|(re, im)| Complex64::new(re, im)).collect())
    }

    /// Overwrite one column of a set from complex values, splitting them
    /// into the real and imaginary buffers.
    pub fn set_complex_column(&mut self, id: VarSetId, column: usize, values: &[Complex64]) -> Result<()> {
        if !self.has_complex() {
            return Err(VectorError::MissingComplexStorage);
        }
        let re: Vec<f64> = values.iter().map(|z| z.re).collect();
        let im: Vec<f64> = values.iter().map(|z| z.im).collect();
        self.set_column(id, column, &re)?;
        self.set_imag_column(id, column, &im)
    }

    /// Check that `other` has the same layout and column count.
    pub(crate) fn check_compatible(&self, other: &MultiVector) -> Result<()> {
        if self.n_columns != other.n_columns {
            return Err(VectorError::ColumnMismatch {
                left: self.n_columns,
                right: other.n_columns,
            });
        }
        if self.layout != other.layout {
            return Err(VectorError::LayoutMismatch);
        }
        Ok(())
    }
}

fn check_column(buf: &SetBuffer, column: usize) -> Result<()> {
    let n_columns = buf.dim(1);
    if column >= n_columns {
        return Err(VectorError::ColumnOutOfRange { column, n_columns });
    }
    Ok(())
}

fn check_rows(buf: &SetBuffer, got: usize) -> Result<()> {
    let expected = buf.dim(0);
    if got != expected {
        return Err(VectorError::ShapeMismatch { expected, got });
    }
    Ok(())
}

fn check_element(buf: &SetBuffer, row: usize, column: usize) -> Result<()> {
    check_column(buf, column)?;
    let len = buf.dim(0);
    if row >= len {
        return Err(VectorError::RowOutOfRange { row, len });
    }
    Ok(())
}

/// Copy column `column` of `buf` into a fresh single-column buffer.
pub(crate) fn read_column(buf: &SetBuffer, column: usize) -> Vec<f64> {
    (0..buf.dim(0)).map(|r| buf[[r, column]]).collect()
}

/// Write a single-column buffer back into column `column` of `buf`.
pub(crate) fn write_column(buf: &mut SetBuffer, column: usize, values: &[f64]) {
    for (r, &v) in values.iter().enumerate() {
        buf[[r, column]] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdao_comm::SerialComm;

    fn serial_vector(options: VectorOptions) -> (MultiVector, VarSetId, VarSetId) {
        let layout = VarSetLayout::from_sets([("nonlinear", 3), ("linear", 2)]).unwrap();
        let a = layout.id("nonlinear").unwrap();
        let b = layout.id("linear").unwrap();
        let vec = MultiVector::allocate(layout, options, Arc::new(SerialComm), Arc::new(VectorInfo::new())).unwrap();
        (vec, a, b)
    }

    #[test]
    fn test_allocate_zeroed_shapes() {
        let (vec, a, b) = serial_vector(VectorOptions::new().with_columns(2));
        assert_eq!(vec.n_columns(), 2);
        assert!(!vec.has_complex());
        assert_eq!(vec.set_data(a).unwrap().dim(0), 3);
        assert_eq!(vec.set_data(a).unwrap().dim(1), 2);
        assert_eq!(vec.set_data(b).unwrap().dim(0), 2);
        assert!(vec.set_data(a).unwrap().iter().all(|&v| v == 0.0));
        assert_eq!(vec.global_len(a).unwrap(), 3);
        assert_eq!(vec.global_offset(b).unwrap(), 0);
    }

    #[test]
    fn test_zero_columns_rejected() {
        let layout = VarSetLayout::from_sets([("x", 1)]).unwrap();
        let err = MultiVector::allocate(
            layout,
            VectorOptions::new().with_columns(0),
            Arc::new(SerialComm),
            Arc::new(VectorInfo::new()),
        )
        .unwrap_err();
        assert!(matches!(err, VectorError::InvalidOptions { .. }));
    }

    #[test]
    fn test_column_access() {
        let (mut vec, a, _) = serial_vector(VectorOptions::new().with_columns(2));
        vec.set_column(a, 1, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(vec.column(a, 1).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(vec.column(a, 0).unwrap(), vec![0.0; 3]);
        assert_eq!(vec.get(a, 2, 1).unwrap(), 3.0);

        vec.set(a, 0, 0, -4.0).unwrap();
        assert_eq!(vec.get(a, 0, 0).unwrap(), -4.0);
    }

    #[test]
    fn test_out_of_range_access() {
        let (mut vec, a, _) = serial_vector(VectorOptions::new().with_columns(2));
        assert_eq!(
            vec.column(a, 2),
            Err(VectorError::ColumnOutOfRange { column: 2, n_columns: 2 })
        );
        assert_eq!(vec.get(a, 3, 0), Err(VectorError::RowOutOfRange { row: 3, len: 3 }));
        assert_eq!(
            vec.set_column(a, 0, &[1.0]),
            Err(VectorError::ShapeMismatch { expected: 3, got: 1 })
        );
        assert!(matches!(
            vec.column(VarSetId::new(7), 0),
            Err(VectorError::UnknownVarSet { .. })
        ));
    }

    #[test]
    fn test_assign_set_row_major() {
        let (mut vec, _, b) = serial_vector(VectorOptions::new().with_columns(2));
        vec.assign_set(b, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(vec.column(b, 0).unwrap(), vec![1.0, 3.0]);
        assert_eq!(vec.column(b, 1).unwrap(), vec![2.0, 4.0]);
        assert!(vec.assign_set(b, &[1.0]).is_err());
    }

    #[test]
    fn test_imag_storage_gated() {
        let (mut real_only, a, _) = serial_vector(VectorOptions::new());
        assert_eq!(real_only.imag_column(a, 0), Err(VectorError::MissingComplexStorage));
        assert_eq!(
            real_only.set_complex_column(a, 0, &[Complex64::new(1.0, 1.0); 3]),
            Err(VectorError::MissingComplexStorage)
        );

        let (mut cs, a, _) = serial_vector(VectorOptions::new().with_complex(true));
        assert!(cs.has_complex());
        let z = [Complex64::new(1.0, 0.5), Complex64::new(2.0, -1.0), Complex64::new(0.0, 1e-30)];
        cs.set_complex_column(a, 0, &z).unwrap();
        assert_eq!(cs.column(a, 0).unwrap(), vec![1.0, 2.0, 0.0]);
        assert_eq!(cs.imag_column(a, 0).unwrap(), vec![0.5, -1.0, 1e-30]);
        assert_eq!(cs.complex_column(a, 0).unwrap(), z.to_vec());
    }
}
