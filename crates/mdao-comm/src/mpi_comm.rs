//! MPI backend.
//!
//! Requires the `mpi` feature and an MPI installation. The caller must keep
//! the `mpi::environment::Universe` alive for as long as any [`MpiComm`] is
//! used:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let world = mdao_comm::MpiComm::world();
//! // ranks 0..n/2 and n/2..n each get their own group
//! let half = world.split((world.rank() * 2 / world.size()) as i32);
//! ```
//!
//! rsmpi aborts the job on communication failures, so the collectives here
//! never return an error of their own.

use std::fmt;

use mpi::collective::SystemOperation;
use mpi::datatype::PartitionMut;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::{Communicator as _, CommunicatorCollectives, Equivalence};
use mpi::Count;

use crate::communicator::Communicator;
use crate::error::Result;

/// Communicator over an MPI process group.
///
/// The group is either `MPI_COMM_WORLD` or any sub-communicator handed in by
/// the owning system, e.g. the communicator of a parallel group.
pub struct MpiComm {
    comm: SimpleCommunicator,
}

// SAFETY: collectives on a given handle are issued by one thread per rank at a
// time (every `Communicator` method is a blocking collective). Concurrent use
// of one handle from several threads requires MPI to be initialized with
// `Threading::Multiple`.
unsafe impl Send for MpiComm {}
unsafe impl Sync for MpiComm {}

impl MpiComm {
    /// Handle on the world communicator.
    pub fn world() -> Self {
        Self {
            comm: SimpleCommunicator::world(),
        }
    }

    /// Wrap an existing communicator.
    pub fn from_communicator(comm: SimpleCommunicator) -> Self {
        Self { comm }
    }

    /// Split the group by `color`; ranks passing the same color end up in the
    /// same sub-group, ordered by their rank in `self`.
    ///
    /// Collective over `self`. Returns `None` for a negative color, which
    /// leaves the calling rank out of every sub-group.
    pub fn split(&self, color: i32) -> Option<Self> {
        let color = if color < 0 {
            Color::undefined()
        } else {
            Color::with_value(color)
        };
        self.comm.split_by_color(color).map(Self::from_communicator)
    }

    /// Underlying rsmpi communicator.
    pub fn raw(&self) -> &SimpleCommunicator {
        &self.comm
    }

    fn gather_varcount<T>(&self, local: &[T]) -> Vec<Vec<T>>
    where
        T: Equivalence + Copy + Default,
    {
        let size = self.comm.size() as usize;

        let count = local.len() as Count;
        let mut counts = vec![0 as Count; size];
        self.comm.all_gather_into(&count, &mut counts[..]);

        let displs: Vec<Count> = counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect();
        let total: usize = counts.iter().map(|&c| c as usize).sum();

        let mut buf = vec![T::default(); total];
        {
            let mut partition = PartitionMut::new(&mut buf[..], &counts[..], &displs[..]);
            self.comm.all_gather_varcount_into(local, &mut partition);
        }

        counts
            .iter()
            .zip(&displs)
            .map(|(&c, &d)| buf[d as usize..(d + c) as usize].to_vec())
            .collect()
    }
}

impl fmt::Debug for MpiComm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpiComm")
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .finish()
    }
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn all_gather_f64(&self, local: &[f64]) -> Result<Vec<Vec<f64>>> {
        Ok(self.gather_varcount(local))
    }

    fn all_gather_usize(&self, local: &[usize]) -> Result<Vec<Vec<usize>>> {
        let wide: Vec<u64> = local.iter().map(|&v| v as u64).collect();
        Ok(self
            .gather_varcount(&wide)
            .into_iter()
            .map(|part| part.into_iter().map(|v| v as usize).collect())
            .collect())
    }

    /// Native `MPI_Allreduce`. Every rank receives the same value, but the
    /// summation order is up to the MPI library and may differ from the
    /// rank-ordered sum of the other backends.
    fn sum_f64(&self, local: f64) -> Result<f64> {
        let mut global = 0.0f64;
        self.comm.all_reduce_into(&local, &mut global, SystemOperation::sum());
        Ok(global)
    }
}
