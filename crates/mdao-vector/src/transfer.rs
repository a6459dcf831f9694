//! Index-mapped transfers between the variable sets of two vectors.
//!
//! A [`TransferPlan`] is built once per (input vector, output vector) pair
//! from two index maps keyed by [`TransferKey`]. Applying it moves data
//! column by column:
//!
//! - [`Direction::Forward`] overwrites input-set entries with the mapped
//!   output-set entries (`in[in_idx[k]] = out[out_idx[k]]`), including the
//!   imaginary buffers when the input vector is under complex step.
//! - [`Direction::Reverse`] accumulates input-set entries into the mapped
//!   output-set entries (`out[out_idx[k]] += in[in_idx[k]]`). Imaginary
//!   buffers are never touched.
//!
//! Index positions are in the global numbering of each set (see
//! [`MultiVector::global_offset`]); on a single process they are plain local
//! row indices.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use mdao_comm::{GatherScatter, IndexSet, IndexedScatter, InsertMode, ScatterMode};
use tracing::{debug, trace};

use crate::error::{Result, VectorError};
use crate::layout::VarSetId;
use crate::vector::{read_column, write_column, MultiVector, SetBuffer};

/// Directed pairing of an input-vector set with an output-vector set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferKey {
    /// Variable set of the input vector
    pub in_set: VarSetId,
    /// Variable set of the output vector
    pub out_set: VarSetId,
}

impl TransferKey {
    /// Create a key
    pub const fn new(in_set: VarSetId, out_set: VarSetId) -> Self {
        Self { in_set, out_set }
    }
}

impl fmt::Display for TransferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.in_set, self.out_set)
    }
}

/// Per-key index lists contributed by the calling rank, in insertion order.
pub type TransferIndices = IndexMap<TransferKey, Vec<usize>>;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Primal evaluation: output values overwrite inputs
    #[default]
    Forward,
    /// Adjoint accumulation: input values are added into outputs
    Reverse,
}

/// Reusable collective plan with one scatter per participating key.
#[derive(Debug)]
pub struct TransferPlan {
    scatters: IndexMap<TransferKey, Box<dyn IndexedScatter>>,
}

impl TransferPlan {
    /// Build a plan from the calling rank's index maps.
    ///
    /// Local index counts of all keys are summed over the group in a single
    /// batched reduction. Keys whose global count is zero are pruned; every
    /// other key gets a scatter on every rank, including ranks that
    /// contribute no indices for it.
    ///
    /// Both vectors must live on the same process group. Every rank must call
    /// this with the same keys in the same order.
    ///
    /// # Errors
    ///
    /// - [`VectorError::GroupMismatch`] if the vectors' groups differ in size
    /// - [`VectorError::MissingKey`] if a key appears in only one map
    /// - [`VectorError::UnknownVarSet`] if a key names a set absent from the
    ///   corresponding vector
    /// - [`VectorError::PeerFailure`] on the other ranks when any of the two
    ///   errors above occurs on some rank only
    /// - [`VectorError::Comm`] if the index data is inconsistent across the
    ///   group (length mismatch, index out of range, differing key counts)
    pub fn build(
        in_inds: &TransferIndices,
        out_inds: &TransferIndices,
        in_vec: &MultiVector,
        out_vec: &MultiVector,
    ) -> Result<Self> {
        let comm = in_vec.comm();
        if comm.size() != out_vec.comm().size() {
            return Err(VectorError::GroupMismatch {
                input: comm.size(),
                output: out_vec.comm().size(),
            });
        }
        // Local consistency is folded into the length reduction as one extra
        // slot, so a rank with bad maps cannot leave the others blocked.
        let local = local_entries(in_inds, out_inds, in_vec, out_vec);
        let mut lens: Vec<usize> = match &local {
            Ok(entries) => entries.iter().map(|e| e.in_idx.len()).collect(),
            Err(_) => vec![0; in_inds.len()],
        };
        lens.push(usize::from(local.is_err()));
        let reduced = comm.all_reduce_sum_usize(&lens);
        let entries = local?;
        let mut lensums = reduced?;
        let failed = lensums.pop().unwrap_or(0);
        if failed > 0 {
            return Err(VectorError::PeerFailure {
                op: "TransferPlan::build",
                failed,
            });
        }

        let mut scatters: IndexMap<TransferKey, Box<dyn IndexedScatter>> = IndexMap::new();
        for (entry, total) in entries.into_iter().zip(lensums) {
            if total == 0 {
                debug!(key = %entry.key, "pruned transfer key without participants");
                continue;
            }
            let scatter = GatherScatter::create(
                &IndexSet::from_vec(entry.out_idx.to_vec()),
                &IndexSet::from_vec(entry.in_idx.to_vec()),
                entry.out_len,
                entry.in_len,
                Arc::clone(comm),
            )?;
            scatters.insert(entry.key, Box::new(scatter));
        }

        debug!(
            rank = comm.rank(),
            keys = in_inds.len(),
            participating = scatters.len(),
            "built transfer plan"
        );
        Ok(Self { scatters })
    }

    /// Whether the plan holds a scatter for `key`
    pub fn contains(&self, key: &TransferKey) -> bool {
        self.scatters.contains_key(key)
    }

    /// Participating keys in build order
    pub fn keys(&self) -> impl Iterator<Item = &TransferKey> + '_ {
        self.scatters.keys()
    }

    /// Number of participating keys
    pub fn len(&self) -> usize {
        self.scatters.len()
    }

    /// Check if no key participates
    pub fn is_empty(&self) -> bool {
        self.scatters.is_empty()
    }

    /// Move data between `in_vec` and `out_vec`.
    ///
    /// Columns of each key are transferred strictly in index order, and keys
    /// in plan order; every rank must make the same calls. A failing
    /// collective aborts the transfer, columns already moved stay moved.
    ///
    /// # Errors
    ///
    /// - [`VectorError::ColumnMismatch`] if the vectors carry different
    ///   column counts
    /// - [`VectorError::MissingComplexStorage`] on a forward transfer under
    ///   complex step where the output vector has imaginary storage and the
    ///   input vector does not; nothing is moved in that case
    /// - [`VectorError::UnknownVarSet`] if a key does not fit the vectors
    /// - [`VectorError::Comm`] if a collective fails
    pub fn apply(&self, in_vec: &mut MultiVector, out_vec: &mut MultiVector, direction: Direction) -> Result<()> {
        if in_vec.n_columns() != out_vec.n_columns() {
            return Err(VectorError::ColumnMismatch {
                left: in_vec.n_columns(),
                right: out_vec.n_columns(),
            });
        }
        for key in self.scatters.keys() {
            in_vec.layout().check(key.in_set)?;
            out_vec.layout().check(key.out_set)?;
        }

        match direction {
            Direction::Forward => {
                let complex = in_vec.under_complex_step() && out_vec.has_complex();
                if complex && !in_vec.has_complex() {
                    return Err(VectorError::MissingComplexStorage);
                }
                trace!(keys = self.len(), complex, "forward transfer");
                for (key, scatter) in &self.scatters {
                    let (i, o) = (key.in_set.index(), key.out_set.index());
                    forward_columns(&**scatter, &mut in_vec.data[i], &out_vec.data[o])?;
                    if complex {
                        if let (Some(in_imag), Some(out_imag)) = (in_vec.imag.as_mut(), out_vec.imag.as_ref()) {
                            forward_columns(&**scatter, &mut in_imag[i], &out_imag[o])?;
                        }
                    }
                }
            }
            Direction::Reverse => {
                trace!(keys = self.len(), "reverse transfer");
                for (key, scatter) in &self.scatters {
                    let (i, o) = (key.in_set.index(), key.out_set.index());
                    reverse_columns(&**scatter, &in_vec.data[i], &mut out_vec.data[o])?;
                }
            }
        }
        Ok(())
    }
}

/// One key of the calling rank's maps, resolved against both vectors.
struct Entry<'a> {
    key: TransferKey,
    in_idx: &'a [usize],
    out_idx: &'a [usize],
    in_len: usize,
    out_len: usize,
}

fn local_entries<'a>(
    in_inds: &'a TransferIndices,
    out_inds: &'a TransferIndices,
    in_vec: &MultiVector,
    out_vec: &MultiVector,
) -> Result<Vec<Entry<'a>>> {
    if let Some(key) = out_inds.keys().find(|k| !in_inds.contains_key(*k)) {
        return Err(VectorError::MissingKey { key: *key, side: "input" });
    }
    in_inds
        .iter()
        .map(|(key, in_idx)| -> Result<Entry<'a>> {
            let out_idx = out_inds
                .get(key)
                .ok_or(VectorError::MissingKey { key: *key, side: "output" })?;
            Ok(Entry {
                key: *key,
                in_idx,
                out_idx,
                in_len: in_vec.local_len(key.in_set)?,
                out_len: out_vec.local_len(key.out_set)?,
            })
        })
        .collect()
}

/// Overwrite every column of `input` with the scattered columns of `output`.
fn forward_columns(scatter: &dyn IndexedScatter, input: &mut SetBuffer, output: &SetBuffer) -> Result<()> {
    for col in 0..input.dim(1) {
        let src = read_column(output, col);
        let mut dst = read_column(input, col);
        scatter.apply(&src, &mut dst, InsertMode::Insert, ScatterMode::Forward)?;
        write_column(input, col, &dst);
    }
    Ok(())
}

/// Accumulate every column of `input` into the scattered columns of `output`.
fn reverse_columns(scatter: &dyn IndexedScatter, input: &SetBuffer, output: &mut SetBuffer) -> Result<()> {
    for col in 0..output.dim(1) {
        let src = read_column(input, col);
        let mut dst = read_column(output, col);
        scatter.apply(&src, &mut dst, InsertMode::Add, ScatterMode::Reverse)?;
        write_column(output, col, &dst);
    }
    Ok(())
}
