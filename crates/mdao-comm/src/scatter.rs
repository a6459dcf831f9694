//! Index-mapped scatter between two distributed single-column vectors.
//!
//! A scatter pairs a *source* index set with a *destination* index set. Each
//! rank contributes its own pairs; positions are in the global numbering of
//! the respective vector, where rank `r` owns the contiguous range that
//! follows the local lengths of ranks `0..r`.
//!
//! - [`ScatterMode::Forward`]: `dst[dst_idx[k]] <- src[src_idx[k]]`
//! - [`ScatterMode::Reverse`]: `src[src_idx[k]] <- dst[dst_idx[k]]`
//!
//! where `<-` is either overwrite ([`InsertMode::Insert`]) or accumulate
//! ([`InsertMode::Add`]). Both creation and application are collectives.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::communicator::Communicator;
use crate::error::{CommError, Result};
use crate::index_set::IndexSet;

/// How scattered values are combined with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Overwrite the destination entry.
    #[default]
    Insert,
    /// Add into the destination entry.
    Add,
}

impl InsertMode {
    #[inline]
    fn combine(self, dst: &mut f64, value: f64) {
        match self {
            InsertMode::Insert => *dst = value,
            InsertMode::Add => *dst += value,
        }
    }
}

/// Direction a scatter moves data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScatterMode {
    /// Source side to destination side.
    #[default]
    Forward,
    /// Destination side back to source side.
    Reverse,
}

/// Collective handle moving one column of data along a fixed index map.
///
/// `x` is the column being read and `y` the column being written. In
/// [`ScatterMode::Forward`] `x` lives on the source side and `y` on the
/// destination side; [`ScatterMode::Reverse`] swaps the roles. Columns are
/// bound per call, the handle never keeps a reference to vector storage.
pub trait IndexedScatter: Send + Sync + fmt::Debug {
    /// Apply the scatter to one column.
    fn apply(&self, x: &[f64], y: &mut [f64], insert: InsertMode, mode: ScatterMode) -> Result<()>;

    /// Number of index pairs contributed by the calling rank.
    fn local_len(&self) -> usize;
}

/// Extent of one distributed single-column vector across the group.
#[derive(Debug, Clone)]
struct Ownership {
    sizes: Vec<usize>,
    offset: usize,
    global_len: usize,
}

impl Ownership {
    fn new(sizes: Vec<usize>, rank: usize) -> Self {
        let offset = sizes[..rank].iter().sum();
        let global_len = sizes.iter().sum();
        Self {
            sizes,
            offset,
            global_len,
        }
    }

    fn local_len(&self, rank: usize) -> usize {
        self.sizes[rank]
    }

    /// Local position of a global index, if the calling rank owns it.
    fn to_local(&self, rank: usize, global: usize) -> Option<usize> {
        (global >= self.offset && global < self.offset + self.sizes[rank]).then(|| global - self.offset)
    }
}

/// Scatter implemented on top of [`Communicator::all_gather_f64`].
///
/// Every application gathers the column being read from all ranks, then each
/// rank writes the entries it owns. Pairs are applied in rank order and, for
/// each rank, in index-set order, so overlapping writes resolve the same way
/// on every backend.
///
/// Each application moves the full global column to every rank, i.e.
/// `O(global_len * size)` traffic per column. The cost buys backend-independent
/// ordering; large groups want a point-to-point scatter instead.
pub struct GatherScatter {
    comm: Arc<dyn Communicator>,
    src: Ownership,
    dst: Ownership,
    /// (global source position, local destination position) pairs landing on this rank.
    forward: Vec<(usize, usize)>,
    /// (global destination position, local source position) pairs landing on this rank.
    reverse: Vec<(usize, usize)>,
    local_len: usize,
}

impl fmt::Debug for GatherScatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatherScatter")
            .field("rank", &self.comm.rank())
            .field("src_global_len", &self.src.global_len)
            .field("dst_global_len", &self.dst.global_len)
            .field("local_len", &self.local_len)
            .field("forward_pairs", &self.forward.len())
            .field("reverse_pairs", &self.reverse.len())
            .finish()
    }
}

impl GatherScatter {
    /// Build a scatter from this rank's index pairs.
    ///
    /// `src_local_len` and `dst_local_len` are the calling rank's local
    /// extents of the source and destination vectors. All consistency checks
    /// run on gathered data, so every rank returns the same error.
    ///
    /// # Errors
    ///
    /// - [`CommError::LengthMismatch`] if any rank's source and destination
    ///   sets differ in length
    /// - [`CommError::IndexOutOfRange`] if any index exceeds the global extent
    pub fn create(
        src_is: &IndexSet,
        dst_is: &IndexSet,
        src_local_len: usize,
        dst_local_len: usize,
        comm: Arc<dyn Communicator>,
    ) -> Result<Self> {
        let rank = comm.rank();
        let extents = comm.all_gather_usize(&[src_local_len, dst_local_len])?;
        let src_indices = comm.all_gather_usize(src_is.as_slice())?;
        let dst_indices = comm.all_gather_usize(dst_is.as_slice())?;

        let mut src_sizes = Vec::with_capacity(extents.len());
        let mut dst_sizes = Vec::with_capacity(extents.len());
        for (r, e) in extents.iter().enumerate() {
            if e.len() != 2 {
                return Err(CommError::Mismatch {
                    op: "GatherScatter::create",
                    detail: format!("rank {} sent {} extents, expected 2", r, e.len()),
                });
            }
            src_sizes.push(e[0]);
            dst_sizes.push(e[1]);
        }
        let src = Ownership::new(src_sizes, rank);
        let dst = Ownership::new(dst_sizes, rank);

        for (r, (s, d)) in src_indices.iter().zip(&dst_indices).enumerate() {
            if s.len() != d.len() {
                return Err(CommError::LengthMismatch {
                    rank: r,
                    src: s.len(),
                    dst: d.len(),
                });
            }
            check_range(r, s, src.global_len)?;
            check_range(r, d, dst.global_len)?;
        }

        let mut forward = Vec::new();
        let mut reverse = Vec::new();
        for (s, d) in src_indices.iter().zip(&dst_indices) {
            for (&gs, &gd) in s.iter().zip(d) {
                if let Some(ld) = dst.to_local(rank, gd) {
                    forward.push((gs, ld));
                }
                if let Some(ls) = src.to_local(rank, gs) {
                    reverse.push((gd, ls));
                }
            }
        }

        trace!(
            rank,
            local_pairs = src_is.len(),
            forward = forward.len(),
            reverse = reverse.len(),
            "created gather scatter"
        );

        Ok(Self {
            comm,
            src,
            dst,
            forward,
            reverse,
            local_len: src_is.len(),
        })
    }

    /// Gather the column being read and concatenate it in rank order.
    fn gather_global(&self, x: &[f64], side: &Ownership) -> Result<Vec<f64>> {
        let gathered = self.comm.all_gather_f64(x)?;
        let mut global = Vec::with_capacity(side.global_len);
        for (r, part) in gathered.into_iter().enumerate() {
            let expected = side.local_len(r);
            if part.len() != expected {
                return Err(CommError::ColumnLength {
                    rank: r,
                    expected,
                    got: part.len(),
                });
            }
            global.extend(part);
        }
        Ok(global)
    }
}

fn check_range(rank: usize, indices: &[usize], len: usize) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&index) => Err(CommError::IndexOutOfRange { rank, index, len }),
        None => Ok(()),
    }
}

impl IndexedScatter for GatherScatter {
    fn apply(&self, x: &[f64], y: &mut [f64], insert: InsertMode, mode: ScatterMode) -> Result<()> {
        let rank = self.comm.rank();
        let (read, write, pairs) = match mode {
            ScatterMode::Forward => (&self.src, &self.dst, &self.forward),
            ScatterMode::Reverse => (&self.dst, &self.src, &self.reverse),
        };

        let global = self.gather_global(x, read)?;
        let expected = write.local_len(rank);
        if y.len() != expected {
            return Err(CommError::ColumnLength {
                rank,
                expected,
                got: y.len(),
            });
        }

        for &(g, l) in pairs {
            insert.combine(&mut y[l], global[g]);
        }
        Ok(())
    }

    fn local_len(&self) -> usize {
        self.local_len
    }
}
