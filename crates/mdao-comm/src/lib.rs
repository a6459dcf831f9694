#![warn(missing_docs)]
//! Collective communication capabilities for distributed MDAO vectors.
//!
//! This crate provides:
//! - [`Communicator`]: group-wide gathers and rank-ordered sum reductions
//! - [`SerialComm`]: a group of one process
//! - [`ThreadComm`]: an in-process SPMD group with one thread per rank
//! - [`MpiComm`]: an MPI-backed group (feature `mpi`)
//! - [`IndexedScatter`] / [`GatherScatter`]: index-mapped single-column
//!   scatters with overwrite or accumulate semantics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mdao_comm::{GatherScatter, IndexSet, IndexedScatter, InsertMode, ScatterMode, SerialComm};
//!
//! let scatter = GatherScatter::create(
//!     &IndexSet::from_vec(vec![1]),
//!     &IndexSet::from_vec(vec![0]),
//!     2,
//!     1,
//!     Arc::new(SerialComm),
//! )
//! .unwrap();
//!
//! let mut dst = [0.0];
//! scatter
//!     .apply(&[3.0, 4.0], &mut dst, InsertMode::Insert, ScatterMode::Forward)
//!     .unwrap();
//! assert_eq!(dst, [4.0]);
//! ```

pub mod communicator;
pub mod error;
pub mod index_set;
#[cfg(feature = "mpi")]
pub mod mpi_comm;
pub mod scatter;
pub mod thread_group;

pub use communicator::{Communicator, SerialComm};
pub use error::{CommError, Result};
pub use index_set::IndexSet;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;
pub use scatter::{GatherScatter, IndexedScatter, InsertMode, ScatterMode};
pub use thread_group::ThreadComm;
