//! In-process SPMD group backed by OS threads.
//!
//! Each rank runs on its own thread and holds a [`ThreadComm`]. Collectives
//! go through a shared slot table in two phases: every rank deposits its
//! contribution and waits on a barrier, then every rank copies the full table
//! and waits on the barrier again before the slots may be reused.
//!
//! Ranks that disagree on the kind of a collective still pass both barriers,
//! so a mismatch surfaces as [`CommError::Mismatch`] on every rank instead of
//! a hang. Under [`ThreadComm::run`], a rank that returns or panics aborts
//! the group: collectives still waiting for it, and any issued later, fail
//! with [`CommError::Mismatch`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::communicator::Communicator;
use crate::error::{CommError, Result};

#[derive(Debug, Clone)]
enum Payload {
    F64(Vec<f64>),
    Usize(Vec<usize>),
}

impl Payload {
    fn kind(&self) -> &'static str {
        match self {
            Payload::F64(_) => "f64",
            Payload::Usize(_) => "usize",
        }
    }
}

#[derive(Debug, Default)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

/// Reusable barrier that can be aborted once a rank leaves the group.
#[derive(Debug)]
struct GroupBarrier {
    size: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl GroupBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(BarrierState::default()),
            cvar: Condvar::new(),
        }
    }

    /// Block until all ranks arrive. Returns `false` if the barrier was
    /// aborted before this generation completed.
    fn wait(&self) -> bool {
        let mut state = self.state.lock();
        if state.aborted {
            return false;
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.cvar.notify_all();
            return true;
        }
        // a completed generation wins over a later abort
        while state.generation == generation {
            if state.aborted {
                return false;
            }
            self.cvar.wait(&mut state);
        }
        true
    }

    fn abort(&self) {
        self.state.lock().aborted = true;
        self.cvar.notify_all();
    }
}

#[derive(Debug)]
struct Shared {
    size: usize,
    slots: Mutex<Vec<Option<Payload>>>,
    barrier: GroupBarrier,
}

/// Handle of one rank in a thread-backed group.
#[derive(Debug)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Create the handles of a group with `size` ranks, one per rank.
    ///
    /// Each handle must be moved to its own thread; calling a collective on
    /// two handles from the same thread deadlocks. Handles created here are
    /// never aborted, so a rank that skips a collective blocks the others.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            size,
            slots: Mutex::new(vec![None; size]),
            barrier: GroupBarrier::new(size),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Run `f` once per rank on a group of `size` threads and collect the
    /// results in rank order.
    ///
    /// When a rank returns or panics the group is aborted, so the remaining
    /// ranks see [`CommError::Mismatch`] from pending collectives instead of
    /// blocking. The first panic (in rank order) is propagated to the caller
    /// once all threads have been joined.
    pub fn run<F, R>(size: usize, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = Self::group(size);
        let f = &f;
        let joined: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let shared = Arc::clone(&comm.shared);
                    scope.spawn(move || {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| f(comm)));
                        shared.barrier.abort();
                        result
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut results = Vec::with_capacity(size);
        let mut first_panic = None;
        for outcome in joined {
            match outcome {
                Ok(Ok(r)) => results.push(r),
                Ok(Err(payload)) | Err(payload) => {
                    if first_panic.is_none() {
                        first_panic = Some(payload);
                    }
                }
            }
        }
        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
        results
    }

    fn exchange(&self, op: &'static str, payload: Payload) -> Result<Vec<Payload>> {
        let kind = payload.kind();
        self.shared.slots.lock()[self.rank] = Some(payload);
        if !self.shared.barrier.wait() {
            return Err(aborted(op));
        }
        let snapshot: Vec<Option<Payload>> = self.shared.slots.lock().clone();
        if !self.shared.barrier.wait() {
            return Err(aborted(op));
        }

        let mut out = Vec::with_capacity(self.shared.size);
        for (rank, slot) in snapshot.into_iter().enumerate() {
            match slot {
                Some(p) if p.kind() == kind => out.push(p),
                Some(p) => {
                    return Err(CommError::Mismatch {
                        op,
                        detail: format!("rank {} issued a {} collective, expected {}", rank, p.kind(), kind),
                    })
                }
                None => {
                    return Err(CommError::Mismatch {
                        op,
                        detail: format!("rank {} did not contribute", rank),
                    })
                }
            }
        }
        Ok(out)
    }
}

fn aborted(op: &'static str) -> CommError {
    CommError::Mismatch {
        op,
        detail: "a rank left the group before the collective completed".to_string(),
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn all_gather_f64(&self, local: &[f64]) -> Result<Vec<Vec<f64>>> {
        let gathered = self.exchange("all_gather_f64", Payload::F64(local.to_vec()))?;
        Ok(gathered
            .into_iter()
            .filter_map(|p| match p {
                Payload::F64(v) => Some(v),
                Payload::Usize(_) => None,
            })
            .collect())
    }

    fn all_gather_usize(&self, local: &[usize]) -> Result<Vec<Vec<usize>>> {
        let gathered = self.exchange("all_gather_usize", Payload::Usize(local.to_vec()))?;
        Ok(gathered
            .into_iter()
            .filter_map(|p| match p {
                Payload::Usize(v) => Some(v),
                Payload::F64(_) => None,
            })
            .collect())
    }
}
