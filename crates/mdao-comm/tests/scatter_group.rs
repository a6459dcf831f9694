use std::sync::Arc;

use approx::assert_relative_eq;
use mdao_comm::{
    CommError, Communicator, GatherScatter, IndexSet, IndexedScatter, InsertMode, ScatterMode,
    ThreadComm,
};

/// Two ranks, each owning two entries of a length-4 source and destination.
/// Rank 0 maps dst[0..2] <- src[2..4], rank 1 maps dst[2..4] <- src[0..2].
fn swap_halves(comm: Arc<dyn Communicator>) -> GatherScatter {
    let (src, dst): (Vec<usize>, Vec<usize>) = if comm.rank() == 0 {
        (vec![2, 3], vec![0, 1])
    } else {
        (vec![0, 1], vec![2, 3])
    };
    GatherScatter::create(&IndexSet::from_vec(src), &IndexSet::from_vec(dst), 2, 2, comm).unwrap()
}

#[test]
fn test_forward_moves_data_across_ranks() {
    let results = ThreadComm::run(2, |comm| {
        let rank = comm.rank();
        let sc = swap_halves(Arc::new(comm));
        let src = if rank == 0 { [1.0, 2.0] } else { [3.0, 4.0] };
        let mut dst = [0.0; 2];
        sc.apply(&src, &mut dst, InsertMode::Insert, ScatterMode::Forward).unwrap();
        dst
    });
    assert_eq!(results[0], [3.0, 4.0]);
    assert_eq!(results[1], [1.0, 2.0]);
}

#[test]
fn test_reverse_accumulates_across_ranks() {
    let results = ThreadComm::run(2, |comm| {
        let rank = comm.rank();
        let sc = swap_halves(Arc::new(comm));
        let dst = if rank == 0 { [10.0, 20.0] } else { [30.0, 40.0] };
        let mut src = [1.0, 1.0];
        sc.apply(&dst, &mut src, InsertMode::Add, ScatterMode::Reverse).unwrap();
        src
    });
    // src[0..2] receives dst[2..4], src[2..4] receives dst[0..2]
    assert_eq!(results[0], [31.0, 41.0]);
    assert_eq!(results[1], [11.0, 21.0]);
}

#[test]
fn test_rank_without_pairs_still_receives() {
    let results = ThreadComm::run(3, |comm| {
        let rank = comm.rank();
        let comm: Arc<dyn Communicator> = Arc::new(comm);
        // Only rank 2 contributes pairs, targeting every rank's destination.
        let (src, dst): (Vec<usize>, Vec<usize>) = if rank == 2 {
            (vec![0, 1, 2], vec![2, 1, 0])
        } else {
            (vec![], vec![])
        };
        let sc = GatherScatter::create(&IndexSet::from_vec(src), &IndexSet::from_vec(dst), 1, 1, comm).unwrap();
        let mut y = [0.0];
        sc.apply(&[(rank + 1) as f64 * 0.5], &mut y, InsertMode::Insert, ScatterMode::Forward)
            .unwrap();
        (sc.local_len(), y[0])
    });
    assert_eq!(results[0].0, 0);
    assert_eq!(results[2].0, 3);
    assert_relative_eq!(results[0].1, 1.5);
    assert_relative_eq!(results[1].1, 1.0);
    assert_relative_eq!(results[2].1, 0.5);
}

#[test]
fn test_inconsistent_pairs_fail_on_every_rank() {
    let results = ThreadComm::run(2, |comm| {
        let rank = comm.rank();
        let (src, dst): (Vec<usize>, Vec<usize>) = if rank == 1 { (vec![0], vec![]) } else { (vec![0], vec![0]) };
        GatherScatter::create(&IndexSet::from_vec(src), &IndexSet::from_vec(dst), 1, 1, Arc::new(comm))
            .map(|_| ())
    });
    for r in results {
        assert_eq!(r, Err(CommError::LengthMismatch { rank: 1, src: 1, dst: 0 }));
    }
}

#[test]
fn test_rank_order_reduction_is_identical_everywhere() {
    let values = [0.1, 0.2, 0.3, 1e-17];
    let results = ThreadComm::run(4, |comm| comm.sum_f64(values[comm.rank()]).unwrap());
    let expected: f64 = ((0.1 + 0.2) + 0.3) + 1e-17;
    for r in results {
        assert_eq!(r.to_bits(), expected.to_bits());
    }
}
