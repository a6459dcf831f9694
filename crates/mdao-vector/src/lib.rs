#![warn(missing_docs)]
//! Distributed multi-column vectors and index-mapped transfers.
//!
//! This crate provides the data-movement layer an MDAO system drives during
//! a solve:
//! - [`VarSetLayout`] / [`VarSetId`]: variable sets resolved to dense ids
//! - [`MultiVector`]: per-set `(rows, columns)` buffers distributed over a
//!   process group, with optional imaginary storage for complex step
//! - [`VectorInfo`]: complex-step mode shared by a system's vectors
//! - [`TransferPlan`]: collective, index-mapped forward (overwrite) and
//!   reverse (accumulate) transfers between two vectors
//! - [`MultiVector::norm`]: group-wide Euclidean norm
//!
//! Every operation that talks to the process group is a collective and must
//! be issued by all ranks in the same order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mdao_comm::SerialComm;
//! use mdao_vector::{
//!     Direction, MultiVector, TransferIndices, TransferKey, TransferPlan, VarSetLayout,
//!     VectorInfo, VectorOptions,
//! };
//!
//! let comm = Arc::new(SerialComm);
//! let info = Arc::new(VectorInfo::new());
//! let layout = VarSetLayout::from_sets([("nonlinear", 2)])?;
//! let set = layout.id("nonlinear").unwrap();
//!
//! let mut inputs = MultiVector::allocate(layout.clone(), VectorOptions::new(), comm.clone(), info.clone())?;
//! let mut outputs = MultiVector::allocate(layout, VectorOptions::new(), comm, info)?;
//! outputs.set_column(set, 0, &[3.0, 4.0])?;
//!
//! let key = TransferKey::new(set, set);
//! let mut in_inds = TransferIndices::new();
//! let mut out_inds = TransferIndices::new();
//! in_inds.insert(key, vec![0, 1]);
//! out_inds.insert(key, vec![1, 0]);
//!
//! let plan = TransferPlan::build(&in_inds, &out_inds, &inputs, &outputs)?;
//! plan.apply(&mut inputs, &mut outputs, Direction::Forward)?;
//!
//! assert_eq!(inputs.column(set, 0)?, vec![4.0, 3.0]);
//! assert_eq!(inputs.norm()?, 5.0);
//! # Ok::<(), mdao_vector::VectorError>(())
//! ```

pub mod algebra;
pub mod error;
pub mod global_default;
pub mod info;
pub mod layout;
pub mod norm;
pub mod options;
pub mod transfer;
pub mod vector;

pub use error::{Result, VectorError};
pub use global_default::{default_n_columns, set_default_n_columns, GlobalDefault, InvalidColumnCountError};
pub use info::{ComplexStepGuard, VectorInfo};
pub use layout::{VarSetId, VarSetLayout};
pub use options::VectorOptions;
pub use transfer::{Direction, TransferIndices, TransferKey, TransferPlan};
pub use vector::{MultiVector, SetBuffer};

// Re-export the communication layer for downstream use
pub use mdao_comm;
